use serde::{Deserialize, Serialize};

/// A summary of the simulation state at a specific tick, for display or export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// The tick counter when the record was taken.
    pub tick: u64,
    /// The total number of real particles in the simulation.
    pub particle_count: u32,
    /// The number of organisms registered with the simulator.
    pub organism_count: u32,
    /// Mean squared speed over all particles.
    pub average_kinetic_energy: f32,
    /// The largest particle speed observed at this tick.
    pub max_speed: f32,
    /// The number of grid chunks holding at least one particle.
    pub occupied_chunks: u32,
}
