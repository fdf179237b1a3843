pub mod config;
pub mod sim_params;
pub mod telemetry;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{SimulationConfig, WorldConfig, GridConfig, ForcesConfig, PopulationConfig, RunConfig, OutputConfig};
pub use sim_params::SimParams;
pub use telemetry::TelemetryRecord;
pub use vecmath::Vec2;
