/*
 * Vicsek Flocking Simulation - Module Definitions
 *
 * This file defines the module structure for the Vicsek flocking kernel.
 * Birds move at constant speed and, every timestep, turn toward the
 * circular mean heading of the birds within a fixed radius, plus noise.
 */

// Re-export key components for easier access
pub use bird::Bird;
pub use diagnostics::TimingSummary;
pub use error::{Error, Result};
pub use params::{AlignmentOrder, ExecutionStrategy, KernelSettings, SimulationParameters};
pub use physics::{circular_mean, step, StepOutput};
pub use rng::{LegacyUniform, Mt19937, RandomStream};
pub use simulation::{simulate, Frame, Simulator, Trajectory};
pub use spatial_grid::SpatialGrid;
pub use state::FlockState;

// Define modules
pub mod bird;
pub mod diagnostics;
pub mod error;
pub mod params;
pub mod physics;
pub mod rng;
pub mod simulation;
pub mod spatial_grid;
pub mod state;

// Seed of the recorded reference runs
pub const DEFAULT_SEED: u32 = 17;
