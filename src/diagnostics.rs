/*
 * Diagnostics Module
 *
 * Summary of per-step wall-clock timings recorded by the simulator. These
 * numbers are for benchmarking only and never influence the trajectory.
 */

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSummary {
    pub steps: usize,
    pub total: Duration,
    pub mean: Duration,
    pub fastest: Duration,
    pub slowest: Duration,
}

impl TimingSummary {
    /// `None` for a run without steps.
    pub fn from_durations(durations: &[Duration]) -> Option<Self> {
        let fastest = *durations.iter().min()?;
        let slowest = *durations.iter().max()?;
        let total: Duration = durations.iter().sum();
        let mean = total / durations.len() as u32;

        Some(Self {
            steps: durations.len(),
            total,
            mean,
            fastest,
            slowest,
        })
    }

    pub fn steps_per_second(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.steps as f64 / secs
        } else {
            0.0
        }
    }
}
