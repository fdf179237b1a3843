use serde::{Deserialize, Serialize};
use anyhow::Result;
use crate::sim_params::SimParams;
use std::path::Path;

// Configuration for world properties
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorldConfig {
    #[serde(default = "default_world_width")]
    pub width: f32,
    #[serde(default = "default_world_height")]
    pub height: f32,
}

// Configuration for the spatial grid
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct GridConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f32,
}

// Parameters of the force law and integration, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ForcesConfig {
    #[serde(default = "default_repulsion_radius")]
    pub repulsion_radius: f32,
    #[serde(default = "default_repulsion_gain")]
    pub repulsion_gain: f32,
    #[serde(default = "default_influence_radius")]
    pub influence_radius: f32,
    #[serde(default = "default_approximation_radius")]
    pub approximation_radius: f32,
    #[serde(default = "default_minimum_amount_to_chunk")]
    pub minimum_amount_to_chunk: u32,
    #[serde(default = "default_universal_force_multiplier")]
    pub universal_force_multiplier: f32,
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
    #[serde(default = "default_drag_coefficient")]
    pub drag_coefficient: f32,
    #[serde(default = "default_min_speed")]
    pub min_speed: f32,
}

// Population seeding, loaded from config.toml
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PopulationConfig {
    #[serde(default = "default_organism_count")]
    pub organism_count: u32,
    #[serde(default = "default_particles_per_organism")]
    pub particles_per_organism: u32,
    #[serde(default = "default_types_per_organism")]
    pub types_per_organism: u32,
    #[serde(default = "default_max_population")]
    pub max_population: u32,
    #[serde(default = "default_spawn_spread")]
    pub spawn_spread: f32,
    #[serde(default = "default_self_cohesion")]
    pub self_cohesion: f32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

// Configuration for the headless run loop
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    #[serde(default = "default_total_steps")]
    pub total_steps: u32,
    #[serde(default = "default_record_interval_steps")]
    pub record_interval_steps: u32,
    #[serde(default)]
    pub worker_threads: usize, // 0 = let rayon decide
}

// Configuration for telemetry export
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_base_filename")]
    pub base_filename: String,
    #[serde(default = "default_save_telemetry")]
    pub save_telemetry: bool,
    #[serde(default = "default_format")]
    pub format: String, // "csv" or "json"
}

// Main simulation configuration structure, loaded from config.toml.
// Every section may be omitted.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct SimulationConfig {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub forces: ForcesConfig,
    #[serde(default)]
    pub population: PopulationConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;

        // --- Validation ---
        if config.population.particles_per_organism == 0 {
            anyhow::bail!("particles_per_organism must be greater than 0.");
        }
        if config.population.organism_count > config.population.max_population {
            anyhow::bail!(
                "organism_count ({}) exceeds max_population ({}).",
                config.population.organism_count,
                config.population.max_population
            );
        }
        if !(config.population.spawn_spread.is_finite() && config.population.spawn_spread >= 0.0) {
            anyhow::bail!("spawn_spread must be non-negative.");
        }
        if !matches!(config.output.format.as_str(), "csv" | "json") {
            anyhow::bail!("Unknown output format '{}'; expected \"csv\" or \"json\".", config.output.format);
        }
        config.get_sim_params().validate().map_err(|e| anyhow::anyhow!(e))?;

        Ok(config)
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        SimParams {
            // World & Grid
            world_width: self.world.width,
            world_height: self.world.height,
            chunk_size: self.grid.chunk_size,
            // Force law
            repulsion_radius: self.forces.repulsion_radius,
            repulsion_gain: self.forces.repulsion_gain,
            influence_radius: self.forces.influence_radius,
            approximation_radius: self.forces.approximation_radius,
            minimum_amount_to_chunk: self.forces.minimum_amount_to_chunk,
            universal_force_multiplier: self.forces.universal_force_multiplier,
            // Integration
            max_speed: self.forces.max_speed,
            drag_coefficient: self.forces.drag_coefficient,
            min_speed: self.forces.min_speed,
            // Population
            types_per_organism: self.population.types_per_organism,
            max_population: self.population.max_population,
            // Execution
            worker_threads: self.run.worker_threads,
        }
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig { width: default_world_width(), height: default_world_height() }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig { chunk_size: default_chunk_size() }
    }
}

impl Default for ForcesConfig {
    fn default() -> Self {
        ForcesConfig {
            repulsion_radius: default_repulsion_radius(),
            repulsion_gain: default_repulsion_gain(),
            influence_radius: default_influence_radius(),
            approximation_radius: default_approximation_radius(),
            minimum_amount_to_chunk: default_minimum_amount_to_chunk(),
            universal_force_multiplier: default_universal_force_multiplier(),
            max_speed: default_max_speed(),
            drag_coefficient: default_drag_coefficient(),
            min_speed: default_min_speed(),
        }
    }
}

impl Default for PopulationConfig {
    fn default() -> Self {
        PopulationConfig {
            organism_count: default_organism_count(),
            particles_per_organism: default_particles_per_organism(),
            types_per_organism: default_types_per_organism(),
            max_population: default_max_population(),
            spawn_spread: default_spawn_spread(),
            self_cohesion: default_self_cohesion(),
            seed: default_seed(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            total_steps: default_total_steps(),
            record_interval_steps: default_record_interval_steps(),
            worker_threads: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: default_base_filename(),
            save_telemetry: default_save_telemetry(),
            format: default_format(),
        }
    }
}

// Defaults mirror SimParams::default() for the runtime tunables
fn default_world_width() -> f32 { SimParams::default().world_width }
fn default_world_height() -> f32 { SimParams::default().world_height }
fn default_chunk_size() -> f32 { SimParams::default().chunk_size }
fn default_repulsion_radius() -> f32 { SimParams::default().repulsion_radius }
fn default_repulsion_gain() -> f32 { SimParams::default().repulsion_gain }
fn default_influence_radius() -> f32 { SimParams::default().influence_radius }
fn default_approximation_radius() -> f32 { SimParams::default().approximation_radius }
fn default_minimum_amount_to_chunk() -> u32 { SimParams::default().minimum_amount_to_chunk }
fn default_universal_force_multiplier() -> f32 { SimParams::default().universal_force_multiplier }
fn default_max_speed() -> f32 { SimParams::default().max_speed }
fn default_drag_coefficient() -> f32 { SimParams::default().drag_coefficient }
fn default_min_speed() -> f32 { SimParams::default().min_speed }
fn default_types_per_organism() -> u32 { SimParams::default().types_per_organism }
fn default_max_population() -> u32 { SimParams::default().max_population }

fn default_organism_count() -> u32 { 8 }
fn default_particles_per_organism() -> u32 { 150 }
fn default_spawn_spread() -> f32 { 100.0 }
fn default_self_cohesion() -> f32 { 0.1 }
fn default_seed() -> u64 { 42 }
fn default_total_steps() -> u32 { 1000 }
fn default_record_interval_steps() -> u32 { 10 }
fn default_base_filename() -> String { "particle_life".to_string() }
fn default_save_telemetry() -> bool { true }
fn default_format() -> String { "csv".to_string() }
