use crate::error::SimulationError;
use crate::grid::SpatialGrid;
use crate::influence::InfluenceMatrix;
use crate::organism::Organism;
use crate::particle::{wrap_position, Particle};
use log::{debug, info, trace, warn};
use particle_life_common::{SimParams, TelemetryRecord, Vec2};
use rayon::prelude::*;
use std::time::Instant;

/// Owns the particle arena, the spatial grid and the global influence matrix, and
/// advances them one tick at a time.
///
/// Nothing here is shared between instances. `step` must not be called concurrently
/// on the same simulator.
#[derive(Debug)]
pub struct Simulator {
    /// Runtime tunables, validated at construction.
    params: SimParams,
    bounds: Vec2,
    /// Particle arena; a particle's id is its index.
    particles: Vec<Particle>,
    grid: SpatialGrid,
    influence: InfluenceMatrix,
    /// External matrix of every registered organism, indexed by organism id.
    organism_externals: Vec<Vec<Vec<f32>>>,
    tick: u64,
    /// Fixed worker pool both step phases run on.
    pool: rayon::ThreadPool,
}

impl Simulator {
    /// Creates a simulator with default tunables for a `width x height` world.
    pub fn new(width: f32, height: f32) -> Result<Self, SimulationError> {
        Self::with_params(SimParams::with_bounds(width, height))
    }

    /// Creates a simulator from explicit parameters, rejecting invalid ones.
    pub fn with_params(params: SimParams) -> Result<Self, SimulationError> {
        params.validate().map_err(SimulationError::InvalidConfig)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(params.worker_threads)
            .build()?;
        let bounds = Vec2::new(params.world_width, params.world_height);
        let grid = SpatialGrid::new(params.chunk_size, bounds.x, bounds.y);
        let (columns, rows) = grid.dimensions();
        info!(
            "Simulator created: world {}x{}, {}x{} chunks of {}, {} worker threads.",
            bounds.x,
            bounds.y,
            columns,
            rows,
            params.chunk_size,
            pool.current_num_threads()
        );

        Ok(Self {
            params,
            bounds,
            particles: Vec::new(),
            grid,
            influence: InfluenceMatrix::default(),
            organism_externals: Vec::new(),
            tick: 0,
            pool,
        })
    }

    // --- Registration ---

    /// Registers an organism with its centroid at `position`.
    /// Returns the organism id assigned to it.
    pub fn add_organism(&mut self, organism: Organism, position: Vec2) -> Result<u32, SimulationError> {
        self.check_registration(1, std::slice::from_ref(&organism))?;
        Ok(self.register(organism, position))
    }

    /// Registers a batch of organisms on a deterministic tiling of spawn points.
    /// Either all of them are registered or none are.
    pub fn add_organisms(&mut self, organisms: Vec<Organism>) -> Result<Vec<u32>, SimulationError> {
        self.check_registration(organisms.len(), &organisms)?;
        let spawn_points = spawn_tiling(organisms.len(), self.bounds);
        Ok(organisms
            .into_iter()
            .zip(spawn_points)
            .map(|(organism, position)| self.register(organism, position))
            .collect())
    }

    fn check_registration(&self, incoming: usize, organisms: &[Organism]) -> Result<(), SimulationError> {
        let cap = self.params.max_population as usize;
        let requested = self.organism_count() + incoming;
        if requested > cap {
            warn!("Rejecting {} organisms: population cap is {}.", incoming, cap);
            return Err(SimulationError::PopulationCapExceeded { requested, cap });
        }
        let expected = self.params.types_per_organism as usize;
        if let Some(found) = organisms.iter().map(Organism::type_count).find(|&t| t != expected) {
            warn!("Rejecting organism with {} types (expected {}).", found, expected);
            return Err(SimulationError::TypeCountMismatch { expected, found });
        }
        Ok(())
    }

    fn register(&mut self, mut organism: Organism, position: Vec2) -> u32 {
        let organism_id = self.organism_externals.len() as u32;
        let types = self.params.types_per_organism as usize;
        let base = organism_id as usize * types;

        organism.recenter(position);
        let (particles, internal, external) = organism.into_parts();

        // Own block, then cross terms against everyone registered so far
        self.influence.grow(base + types);
        for a in 0..types {
            for b in 0..types {
                self.influence.set(base + a, base + b, internal[a][b]);
            }
        }
        for (other_id, other_external) in self.organism_externals.iter().enumerate() {
            let other_base = other_id * types;
            for a in 0..types {
                for b in 0..types {
                    self.influence.set(base + a, other_base + b, external[a][b]);
                    self.influence.set(other_base + b, base + a, other_external[b][a]);
                }
            }
        }
        self.organism_externals.push(external);

        self.grid.ensure_type_capacity(base + types);
        let count = particles.len();
        for mut particle in particles {
            let index = self.particles.len();
            particle.id = index as u32;
            particle.organism_id = organism_id;
            particle.type_id = (base + particle.type_id as usize) as u32;
            particle.mass = 1.0;
            particle.position = wrap_position(particle.position, self.bounds);
            self.grid.insert(index, &particle);
            self.particles.push(particle);
        }

        info!(
            "Registered organism {} with {} particles at ({:.1}, {:.1}); {} particles total.",
            organism_id,
            count,
            position.x,
            position.y,
            self.particles.len()
        );
        organism_id
    }

    // --- World ---

    /// Changes the world size, wrapping and re-bucketing every particle.
    pub fn update_size(&mut self, width: f32, height: f32) -> Result<(), SimulationError> {
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "world size must be positive and finite, got {}x{}",
                width, height
            )));
        }
        let grew = width > self.bounds.x || height > self.bounds.y;
        let shrunk = width < self.bounds.x || height < self.bounds.y;
        debug!(
            "World resize {}x{} -> {}x{} (grew: {}, shrunk: {}).",
            self.bounds.x, self.bounds.y, width, height, grew, shrunk
        );

        self.bounds = Vec2::new(width, height);
        self.params.world_width = width;
        self.params.world_height = height;
        self.grid.resize(width, height, &mut self.particles);
        Ok(())
    }

    // --- Stepping ---

    /// Advances the simulation by one tick.
    pub fn step(&mut self) {
        let step_start_time = Instant::now();

        // --- 1. Force phase (parallel over chunks) ---
        // Reads positions only; each chunk produces velocities for its own members.
        let velocity_updates: Vec<Vec<(usize, Vec2)>> = self.pool.install(|| {
            let sim = &*self;
            sim.grid
                .occupied_chunks()
                .into_par_iter()
                .map(|(column, row)| sim.chunk_velocities(column, row))
                .collect()
        });

        // --- 2. Barrier: every chunk has finished before any velocity is written ---
        for (index, velocity) in velocity_updates.into_iter().flatten() {
            self.particles[index].velocity = velocity;
        }

        // --- 3. Integration phase (parallel) ---
        let bounds = self.bounds;
        let particles = &mut self.particles;
        self.pool.install(|| {
            particles.par_iter_mut().for_each(|particle| {
                particle.position = wrap_position(particle.position + particle.velocity, bounds);
            });
        });

        // --- 4. Rehash (sequential) ---
        let moved = self.grid.rehash(&self.particles);

        self.tick += 1;
        trace!(
            "Tick {} completed in {:.2} ms ({} particles re-bucketed).",
            self.tick,
            step_start_time.elapsed().as_secs_f64() * 1000.0,
            moved
        );
    }

    /// New velocities for every member of one chunk.
    fn chunk_velocities(&self, column: usize, row: usize) -> Vec<(usize, Vec2)> {
        let Some(chunk) = self.grid.chunk(column, row) else {
            return Vec::new();
        };
        let mut neighbors = Vec::new();
        chunk
            .members()
            .iter()
            .map(|&index| (index, self.next_velocity(&self.particles[index], &mut neighbors)))
            .collect()
    }

    fn next_velocity(&self, particle: &Particle, neighbors: &mut Vec<Particle>) -> Vec2 {
        self.grid.neighborhood_into(
            &self.particles,
            particle.position,
            self.params.influence_radius,
            self.params.approximation_radius,
            self.params.minimum_amount_to_chunk,
            neighbors,
        );
        let mut force = Vec2::zero();
        for neighbor in neighbors.iter() {
            if neighbor.id == particle.id {
                continue;
            }
            force += self.compute_force(particle, neighbor);
        }
        self.limit_speed(particle.velocity + force)
    }

    /// Clamps to `max_speed`, then applies quadratic drag along the same direction.
    /// Speed never drops below `min_speed` unless the velocity is exactly zero.
    fn limit_speed(&self, velocity: Vec2) -> Vec2 {
        let Some(direction) = velocity.unit() else {
            return Vec2::zero();
        };
        let mut speed = velocity.length().min(self.params.max_speed);
        speed -= self.params.drag_coefficient * speed * speed;
        speed = speed.max(self.params.min_speed);
        direction * speed
    }

    /// Force `neighbor` exerts on `source`: linear repulsion inside the repulsion
    /// radius, otherwise the influence-matrix term inside the influence radius, scaled
    /// by the neighbor's mass. Not symmetric. Coincident particles exert nothing.
    pub fn compute_force(&self, source: &Particle, neighbor: &Particle) -> Vec2 {
        let diff = source.position - neighbor.position;
        let distance = diff.length();
        if !(distance > 0.0 && distance.is_finite()) {
            return Vec2::zero();
        }
        let direction = diff / distance;

        let mut factor = 0.0;
        if distance < self.params.repulsion_radius {
            factor -= self.params.repulsion_gain * (distance - self.params.repulsion_radius);
        } else if distance < self.params.influence_radius {
            let strength = self.influence.get(source.type_id as usize, neighbor.type_id as usize);
            factor += strength / (distance - self.params.influence_radius);
        }

        direction * (factor * self.params.universal_force_multiplier * neighbor.mass)
    }

    // --- Queries ---

    /// Copy of every particle, for rendering.
    pub fn get_all_particles(&self) -> Vec<Particle> {
        self.particles.clone()
    }

    /// Borrowed view of the particle arena.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// What a particle at `position` would interact with this tick.
    pub fn get_neighborhood(&self, position: Vec2) -> Vec<Particle> {
        self.grid.neighborhood(
            &self.particles,
            position,
            self.params.influence_radius,
            self.params.approximation_radius,
            self.params.minimum_amount_to_chunk,
        )
    }

    /// Mean squared speed over all particles; 0 for an empty world.
    pub fn compute_average_kinetic_energy(&self) -> f32 {
        if self.particles.is_empty() {
            return 0.0;
        }
        let total: f32 = self.particles.iter().map(|p| p.velocity.length_squared()).sum();
        total / self.particles.len() as f32
    }

    /// Summary of the current tick.
    pub fn telemetry(&self) -> TelemetryRecord {
        let max_speed = self.particles.iter().map(Particle::speed).fold(0.0f32, f32::max);
        TelemetryRecord {
            tick: self.tick,
            particle_count: self.particles.len() as u32,
            organism_count: self.organism_count() as u32,
            average_kinetic_energy: self.compute_average_kinetic_energy(),
            max_speed,
            occupied_chunks: self.grid.occupied_chunks().len() as u32,
        }
    }

    pub fn repulsion_radius(&self) -> f32 {
        self.params.repulsion_radius
    }

    pub fn influence_radius(&self) -> f32 {
        self.params.influence_radius
    }

    pub fn approximation_radius(&self) -> f32 {
        self.params.approximation_radius
    }

    pub fn chunk_size(&self) -> f32 {
        self.params.chunk_size
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn organism_count(&self) -> usize {
        self.organism_externals.len()
    }

    /// Influence of global type `neighbor` on global type `source`.
    pub fn influence(&self, source: u32, neighbor: u32) -> f32 {
        self.influence.get(source as usize, neighbor as usize)
    }

    /// Overrides one influence matrix entry.
    pub fn set_influence(&mut self, source: u32, neighbor: u32, value: f32) {
        self.influence.set(source as usize, neighbor as usize, value);
    }
}

/// Spawn points for `count` organisms: centers of a near-square tiling of the world.
fn spawn_tiling(count: usize, bounds: Vec2) -> Vec<Vec2> {
    if count == 0 {
        return Vec::new();
    }
    let columns = (count as f32).sqrt().ceil() as usize;
    let rows = count.div_ceil(columns);
    let cell_w = bounds.x / columns as f32;
    let cell_h = bounds.y / rows as f32;
    (0..count)
        .map(|k| {
            let (ix, iy) = (k % columns, k / columns);
            Vec2::new((ix as f32 + 0.5) * cell_w, (iy as f32 + 0.5) * cell_h)
        })
        .collect()
}
