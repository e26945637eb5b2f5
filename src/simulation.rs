/*
 * Simulation Module
 *
 * Drives the step kernel from an initial flock for `Nt` timesteps and
 * collects every frame into a trajectory. Steps run strictly one after the
 * other; only the neighbor loop inside a step may fan out.
 *
 * A run is all-or-nothing: if any step fails, the partial trajectory is
 * dropped and the error is returned unchanged.
 */

use glam::DVec2;
use std::time::{Duration, Instant};

use crate::diagnostics::TimingSummary;
use crate::error::Result;
use crate::params::{AlignmentOrder, ExecutionStrategy, KernelSettings, SimulationParameters};
use crate::physics;
use crate::rng::RandomStream;
use crate::state::FlockState;

/// Positions and velocities of every bird at one frame, index-aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub positions: Vec<DVec2>,
    pub velocities: Vec<DVec2>,
}

impl Frame {
    fn of(state: &FlockState, speed: f64) -> Self {
        Self {
            positions: state.positions(),
            velocities: state.velocities(speed),
        }
    }
}

/// Output of a run: `Nt + 1` frames (the initial one included) and, when
/// timing is enabled, `Nt` step durations.
#[derive(Debug, Clone)]
pub struct Trajectory {
    pub frames: Vec<Frame>,
    pub step_durations: Vec<Duration>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn final_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn positions_series(&self) -> Vec<Vec<DVec2>> {
        self.frames.iter().map(|f| f.positions.clone()).collect()
    }

    pub fn velocities_series(&self) -> Vec<Vec<DVec2>> {
        self.frames.iter().map(|f| f.velocities.clone()).collect()
    }

    pub fn timing_summary(&self) -> Option<TimingSummary> {
        TimingSummary::from_durations(&self.step_durations)
    }

    /// `(positions_series, velocities_series, step_durations)`.
    pub fn into_parts(self) -> (Vec<Vec<DVec2>>, Vec<Vec<DVec2>>, Vec<Duration>) {
        let (positions, velocities) = self
            .frames
            .into_iter()
            .map(|f| (f.positions, f.velocities))
            .unzip();
        (positions, velocities, self.step_durations)
    }
}

#[derive(Debug, Clone)]
pub struct Simulator {
    params: SimulationParameters,
    settings: KernelSettings,
}

impl Simulator {
    pub fn new(params: SimulationParameters, settings: KernelSettings) -> Result<Self> {
        params.validate()?;
        settings.validate()?;
        if settings.alignment == AlignmentOrder::InPlace
            && settings.execution == ExecutionStrategy::Parallel
        {
            log::warn!("in-place alignment is inherently sequential; ignoring parallel execution");
        }
        Ok(Self { params, settings })
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    /// Seeds a fresh random stream, draws the initial flock, and runs.
    pub fn run(&self, seed: u32) -> Result<Trajectory> {
        let mut rng = RandomStream::seeded(seed);
        let initial = FlockState::initialize(&self.params, &mut rng)?;
        self.run_from(initial, &mut rng)
    }

    /// Runs from an explicit initial flock, drawing noise from `rng`.
    pub fn run_from(&self, initial: FlockState, rng: &mut RandomStream) -> Result<Trajectory> {
        initial.check(&self.params)?;
        let nt = self.params.num_steps;
        log::info!(
            "simulating {} birds for {} steps ({:?}, {:?}, grid: {})",
            self.params.num_birds,
            nt,
            self.settings.execution,
            self.settings.alignment,
            self.settings.enable_spatial_grid
        );

        let mut frames = Vec::with_capacity(nt + 1);
        let mut step_durations = Vec::with_capacity(if self.settings.record_timings { nt } else { 0 });

        frames.push(Frame::of(&initial, self.params.v0));
        let mut state = initial;

        for frame in 0..nt {
            let started = Instant::now();
            let out = physics::step(frame, &self.params, &self.settings, state, rng)?;
            if self.settings.record_timings {
                let elapsed = started.elapsed();
                log::debug!("frame {} took {:?}", frame, elapsed);
                step_durations.push(elapsed);
            }
            frames.push(Frame {
                positions: out.positions,
                velocities: out.velocities,
            });
            state = out.state;
        }

        log::info!(
            "finished {} steps, final polarization {:.4}",
            nt,
            state.polarization()
        );
        Ok(Trajectory {
            frames,
            step_durations,
        })
    }
}

/// Runs a full simulation with default kernel settings.
///
/// The default alignment reads a frozen snapshot of the headings. To
/// reproduce the recorded reference trajectories, run a [`Simulator`] with
/// [`KernelSettings::reference()`] instead.
pub fn simulate(params: SimulationParameters, seed: u32) -> Result<Trajectory> {
    Simulator::new(params, KernelSettings::default())?.run(seed)
}
