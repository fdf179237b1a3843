use crate::error::SimulationError;
use crate::particle::Particle;
use particle_life_common::{PopulationConfig, Vec2};
use rand::distr::Uniform;
use rand::prelude::*;

/// Shape of randomly generated organisms.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganismTemplate {
    pub particle_count: usize,
    pub type_count: usize,
    /// Side of the square the particles are scattered over, centered on the origin.
    pub spawn_spread: f32,
    /// Internal matrix diagonal.
    pub self_cohesion: f32,
}

impl Default for OrganismTemplate {
    fn default() -> Self {
        OrganismTemplate::from(&PopulationConfig::default())
    }
}

impl From<&PopulationConfig> for OrganismTemplate {
    fn from(config: &PopulationConfig) -> Self {
        OrganismTemplate {
            particle_count: config.particles_per_organism as usize,
            type_count: config.types_per_organism as usize,
            spawn_spread: config.spawn_spread,
            self_cohesion: config.self_cohesion,
        }
    }
}

/// A fixed-size cluster of particles with its own cohesion and interaction matrices.
///
/// Particle types are local (`0..type_count`) until the organism is registered with
/// a simulator, which takes the particles over.
#[derive(Debug, Clone, PartialEq)]
pub struct Organism {
    particles: Vec<Particle>,
    internal_matrix: Vec<Vec<f32>>,
    external_matrix: Vec<Vec<f32>>,
}

impl Organism {
    /// Builds an organism from explicit particles and matrices.
    pub fn new(
        particles: Vec<Particle>,
        internal_matrix: Vec<Vec<f32>>,
        external_matrix: Vec<Vec<f32>>,
    ) -> Result<Self, SimulationError> {
        if particles.is_empty() {
            return Err(SimulationError::InvalidOrganism("organism has no particles".to_string()));
        }
        let type_count = internal_matrix.len();
        if type_count == 0 {
            return Err(SimulationError::InvalidOrganism("organism has no types".to_string()));
        }
        let is_square = |m: &[Vec<f32>]| m.len() == type_count && m.iter().all(|row| row.len() == type_count);
        if !is_square(&internal_matrix) || !is_square(&external_matrix) {
            return Err(SimulationError::InvalidOrganism(format!(
                "internal and external matrices must both be {}x{}",
                type_count, type_count
            )));
        }
        if let Some(p) = particles.iter().find(|p| p.type_id as usize >= type_count) {
            return Err(SimulationError::InvalidOrganism(format!(
                "particle type {} out of range for {} types",
                p.type_id, type_count
            )));
        }
        Ok(Organism { particles, internal_matrix, external_matrix })
    }

    /// Generates an organism with random particle types, positions and matrices.
    pub fn random<R: Rng + ?Sized>(template: &OrganismTemplate, rng: &mut R) -> Result<Self, SimulationError> {
        if template.particle_count == 0 || template.type_count == 0 {
            return Err(SimulationError::InvalidOrganism(
                "template needs at least one particle and one type".to_string(),
            ));
        }
        let half = template.spawn_spread * 0.5;
        let coord_dist = Uniform::new_inclusive(-half, half)?;
        let type_dist = Uniform::new(0, template.type_count as u32)?;
        let strength_dist = Uniform::new(-1.0f32, 1.0f32)?;

        let particles = (0..template.particle_count)
            .map(|_| {
                let position = Vec2::new(rng.sample(coord_dist), rng.sample(coord_dist));
                Particle::new(rng.sample(type_dist), position)
            })
            .collect();

        let n = template.type_count;
        let mut internal_matrix = vec![vec![0.0; n]; n];
        let mut external_matrix = vec![vec![0.0; n]; n];
        for i in 0..n {
            for j in 0..n {
                // One draw shared by both matrices: strong internal pull, external push
                let v = rng.sample(strength_dist);
                external_matrix[i][j] = v - 1.0;
                internal_matrix[i][j] = if i == j { template.self_cohesion } else { v + 1.0 };
            }
        }

        Ok(Organism { particles, internal_matrix, external_matrix })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn type_count(&self) -> usize {
        self.internal_matrix.len()
    }

    pub fn internal_influence(&self, a: usize, b: usize) -> f32 {
        self.internal_matrix[a][b]
    }

    pub fn external_influence(&self, a: usize, b: usize) -> f32 {
        self.external_matrix[a][b]
    }

    pub fn centroid(&self) -> Vec2 {
        let sum = self
            .particles
            .iter()
            .fold(Vec2::zero(), |acc, p| acc + p.position);
        sum / self.particles.len() as f32
    }

    /// Translates every particle so the centroid sits at `position`.
    pub fn recenter(&mut self, position: Vec2) {
        let offset = position - self.centroid();
        for particle in &mut self.particles {
            particle.position += offset;
        }
    }

    /// Hands the particles and matrices over to a simulator.
    pub(crate) fn into_parts(self) -> (Vec<Particle>, Vec<Vec<f32>>, Vec<Vec<f32>>) {
        (self.particles, self.internal_matrix, self.external_matrix)
    }
}

/// Generates `n` random organisms, refusing populations above `max_population`.
pub fn create_random_population<R: Rng + ?Sized>(
    n: usize,
    max_population: usize,
    template: &OrganismTemplate,
    rng: &mut R,
) -> Result<Vec<Organism>, SimulationError> {
    if n > max_population {
        return Err(SimulationError::PopulationCapExceeded { requested: n, cap: max_population });
    }
    (0..n).map(|_| Organism::random(template, rng)).collect()
}
