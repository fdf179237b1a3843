//! Particle-life simulation core: typed particles grouped into organisms, a
//! uniform spatial grid with long-range aggregation, and a two-phase parallel step
//! over a toroidal world.

pub mod error;
pub mod grid;
pub mod influence;
pub mod organism;
pub mod particle;
pub mod simulation;

pub use error::SimulationError;
pub use grid::{Chunk, SpatialGrid};
pub use influence::InfluenceMatrix;
pub use organism::{create_random_population, Organism, OrganismTemplate};
pub use particle::{Particle, AGGREGATE_ID};
pub use simulation::Simulator;

pub use particle_life_common::{SimParams, SimulationConfig, TelemetryRecord, Vec2};
