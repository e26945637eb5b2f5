/*
 * Simulation Parameters Module
 *
 * This module defines the physical parameters of a Vicsek run and the
 * kernel settings that pick an execution strategy. Parameters are fixed
 * for the lifetime of a run; they are validated once, up front, so the
 * step kernel never sees an out-of-domain value.
 */

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// Physical parameters for one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub v0: f64,  // constant speed
    pub eta: f64, // noise magnitude
    #[serde(alias = "L")]
    pub domain_size: f64,
    #[serde(alias = "R")]
    pub radius: f64,
    pub dt: f64,
    #[serde(alias = "Nt")]
    pub num_steps: usize,
    #[serde(alias = "N")]
    pub num_birds: usize,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            v0: 1.0,
            eta: 0.5,
            domain_size: 10.0,
            radius: 1.0,
            dt: 0.2,
            num_steps: 10,
            num_birds: 10,
        }
    }
}

impl SimulationParameters {
    pub fn new(
        v0: f64,
        eta: f64,
        domain_size: f64,
        radius: f64,
        dt: f64,
        num_steps: usize,
        num_birds: usize,
    ) -> Self {
        Self {
            v0,
            eta,
            domain_size,
            radius,
            dt,
            num_steps,
            num_birds,
        }
    }

    /// Checks every parameter against its domain.
    ///
    /// Non-finite values are rejected along with out-of-range ones, so a
    /// validated parameter set cannot seed NaNs into the trajectory.
    pub fn validate(&self) -> Result<()> {
        if self.num_birds < 1 {
            return Err(Error::invalid("number of birds must be >= 1, got 0"));
        }
        positive("domain size L", self.domain_size)?;
        positive("interaction radius R", self.radius)?;
        positive("timestep dt", self.dt)?;
        non_negative("speed v0", self.v0)?;
        non_negative("noise eta", self.eta)?;
        Ok(())
    }

    #[inline]
    pub fn radius_squared(&self) -> f64 {
        self.radius * self.radius
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::invalid(format!(
            "{name} must be finite and > 0, got {value}"
        )));
    }
    Ok(())
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::invalid(format!(
            "{name} must be finite and >= 0, got {value}"
        )));
    }
    Ok(())
}

// How the per-bird neighbor loop is scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStrategy {
    Sequential,
    #[default]
    Parallel,
}

// Which headings a bird's neighbor sum reads within one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentOrder {
    /// Every bird reads the headings as they were before the step.
    #[default]
    Snapshot,
    /// Birds are updated in index order and later birds read the new
    /// headings of earlier ones. This is the order the recorded reference
    /// trajectories were produced with. Always evaluated sequentially.
    InPlace,
}

// Kernel settings that change scheduling, never the physics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    pub execution: ExecutionStrategy,
    pub alignment: AlignmentOrder,
    pub enable_spatial_grid: bool,
    pub cell_size_factor: f64, // Multiplier for cell size relative to the interaction radius
    pub record_timings: bool,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            execution: ExecutionStrategy::Parallel,
            alignment: AlignmentOrder::Snapshot,
            enable_spatial_grid: false,
            cell_size_factor: 1.0,
            record_timings: true,
        }
    }
}

impl KernelSettings {
    pub fn sequential() -> Self {
        Self {
            execution: ExecutionStrategy::Sequential,
            ..Self::default()
        }
    }

    /// Settings that reproduce the recorded reference trajectories.
    pub fn reference() -> Self {
        Self {
            execution: ExecutionStrategy::Sequential,
            alignment: AlignmentOrder::InPlace,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.enable_spatial_grid {
            positive("cell size factor", self.cell_size_factor)?;
        }
        Ok(())
    }
}
