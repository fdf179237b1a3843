use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, read on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimParams {
    // World & Grid
    pub world_width: f32,
    pub world_height: f32,
    pub chunk_size: f32,

    // Force law
    pub repulsion_radius: f32,
    pub repulsion_gain: f32,
    pub influence_radius: f32,
    pub approximation_radius: f32,
    pub minimum_amount_to_chunk: u32, // Chunks below this population are never aggregated
    pub universal_force_multiplier: f32,

    // Integration
    pub max_speed: f32,
    pub drag_coefficient: f32,
    pub min_speed: f32, // Floor applied after drag

    // Population
    pub types_per_organism: u32,
    pub max_population: u32,

    // Execution
    pub worker_threads: usize, // 0 = rayon default
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            world_width: 1600.0,
            world_height: 900.0,
            chunk_size: 50.0,
            repulsion_radius: 10.0,
            repulsion_gain: 0.25,
            influence_radius: 100.0,
            approximation_radius: 60.0,
            minimum_amount_to_chunk: 8,
            universal_force_multiplier: 1.0,
            max_speed: 2.0,
            drag_coefficient: 0.05,
            min_speed: 1e-4,
            types_per_organism: 8,
            max_population: 8,
            worker_threads: 0,
        }
    }
}

impl SimParams {
    /// Default parameters for a world of the given size.
    pub fn with_bounds(width: f32, height: f32) -> Self {
        SimParams { world_width: width, world_height: height, ..SimParams::default() }
    }

    /// Checks the parameters for values the simulator cannot run with.
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.world_width.is_finite() && self.world_width > 0.0)
            || !(self.world_height.is_finite() && self.world_height > 0.0)
        {
            return Err(format!(
                "world size must be positive and finite, got {}x{}",
                self.world_width, self.world_height
            ));
        }
        if !(self.chunk_size.is_finite() && self.chunk_size > 0.0) {
            return Err(format!("chunk_size must be positive, got {}", self.chunk_size));
        }
        let radii = [
            ("repulsion_radius", self.repulsion_radius),
            ("influence_radius", self.influence_radius),
            ("approximation_radius", self.approximation_radius),
        ];
        for (name, value) in radii {
            if !(value.is_finite() && value >= 0.0) {
                return Err(format!("{} must be non-negative and finite, got {}", name, value));
            }
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(format!("max_speed must be positive, got {}", self.max_speed));
        }
        if !(self.drag_coefficient.is_finite() && self.drag_coefficient >= 0.0) {
            return Err(format!("drag_coefficient must be non-negative, got {}", self.drag_coefficient));
        }
        if !(self.min_speed.is_finite() && self.min_speed >= 0.0) {
            return Err(format!("min_speed must be non-negative, got {}", self.min_speed));
        }
        if !self.repulsion_gain.is_finite() || !self.universal_force_multiplier.is_finite() {
            return Err("repulsion_gain and universal_force_multiplier must be finite".to_string());
        }
        if self.types_per_organism == 0 {
            return Err("types_per_organism must be greater than 0".to_string());
        }
        Ok(())
    }
}
