use crate::particle::{wrap_position, Particle};
use log::{debug, trace};
use particle_life_common::Vec2;

/// One bucket of the spatial grid.
///
/// `members` holds indices into the simulator's particle arena; `type_counts` is
/// indexed by global type id.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    members: Vec<usize>,
    type_counts: Vec<u32>,
}

impl Chunk {
    fn with_type_capacity(type_count: usize) -> Self {
        Chunk { members: Vec::new(), type_counts: vec![0; type_count] }
    }

    /// Arena indices of the particles stored in this chunk.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    pub fn particle_count(&self) -> u32 {
        self.members.len() as u32
    }

    /// Number of member particles of global type `type_id`.
    pub fn type_count(&self, type_id: usize) -> u32 {
        self.type_counts.get(type_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// Where an arena index currently lives: (column, row, slot within the chunk)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    column: usize,
    row: usize,
    index: usize,
}

/// Uniform bucket grid over the toroidal world.
///
/// The backing chunk array only ever grows; `columns`/`rows` track the part of it
/// covering the current world bounds.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    chunk_size: f32,
    bounds: Vec2,
    columns: usize,
    rows: usize,
    chunks: Vec<Vec<Chunk>>, // [column][row]
    slots: Vec<Option<Slot>>, // per arena index
    type_count: usize,
}

impl SpatialGrid {
    /// Creates a grid covering `width x height`. The caller validates the sizes.
    pub fn new(chunk_size: f32, width: f32, height: f32) -> Self {
        let mut grid = SpatialGrid {
            chunk_size,
            bounds: Vec2::new(width, height),
            columns: 0,
            rows: 0,
            chunks: Vec::new(),
            slots: Vec::new(),
            type_count: 0,
        };
        grid.set_dimensions(width, height);
        grid
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn bounds(&self) -> Vec2 {
        self.bounds
    }

    /// Chunk columns and rows covering the current bounds.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    /// Chunk columns and rows actually allocated. Never decreases.
    pub fn allocated_dimensions(&self) -> (usize, usize) {
        (self.chunks.len(), self.chunks.first().map_or(0, Vec::len))
    }

    pub fn chunk(&self, column: usize, row: usize) -> Option<&Chunk> {
        self.chunks.get(column).and_then(|c| c.get(row))
    }

    /// Number of particles stored across all chunks.
    pub fn particle_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Column and row of the chunk currently holding arena index `index`.
    pub fn member_chunk(&self, index: usize) -> Option<(usize, usize)> {
        self.slots.get(index).copied().flatten().map(|s| (s.column, s.row))
    }

    /// Column and row a position buckets into: `floor(position / chunk_size)`,
    /// clamped to the current dimensions.
    #[inline(always)]
    pub fn chunk_index_of(&self, position: Vec2) -> (usize, usize) {
        let column = (position.x / self.chunk_size).floor().max(0.0) as usize;
        let row = (position.y / self.chunk_size).floor().max(0.0) as usize;
        (
            column.min(self.columns.saturating_sub(1)),
            row.min(self.rows.saturating_sub(1)),
        )
    }

    pub fn chunk_center(&self, column: usize, row: usize) -> Vec2 {
        Vec2::new(
            (column as f32 + 0.5) * self.chunk_size,
            (row as f32 + 0.5) * self.chunk_size,
        )
    }

    /// Coordinates of every chunk inside the current bounds that holds particles.
    pub fn occupied_chunks(&self) -> Vec<(usize, usize)> {
        let mut occupied = Vec::new();
        for column in 0..self.columns {
            for row in 0..self.rows {
                if !self.chunks[column][row].is_empty() {
                    occupied.push((column, row));
                }
            }
        }
        occupied
    }

    /// Makes every chunk able to count `type_count` global types.
    pub fn ensure_type_capacity(&mut self, type_count: usize) {
        if type_count <= self.type_count {
            return;
        }
        for chunk in self.chunks.iter_mut().flatten() {
            chunk.type_counts.resize(type_count, 0);
        }
        self.type_count = type_count;
    }

    /// Changes the world bounds, wrapping every particle into them and re-bucketing.
    /// The backing chunk array grows if needed but is never shrunk.
    pub fn resize(&mut self, width: f32, height: f32, particles: &mut [Particle]) {
        let previous = self.bounds;
        self.set_dimensions(width, height);
        debug!(
            "Grid resized {}x{} -> {}x{}: {}x{} active chunks, {}x{} allocated.",
            previous.x,
            previous.y,
            width,
            height,
            self.columns,
            self.rows,
            self.allocated_dimensions().0,
            self.allocated_dimensions().1
        );

        let bounds = self.bounds;
        for particle in particles.iter_mut() {
            particle.position = wrap_position(particle.position, bounds);
        }
        self.rehash(particles);
    }

    fn set_dimensions(&mut self, width: f32, height: f32) {
        self.bounds = Vec2::new(width, height);
        self.columns = ((width / self.chunk_size).ceil() as usize).max(1);
        self.rows = ((height / self.chunk_size).ceil() as usize).max(1);

        let (allocated_columns, allocated_rows) = self.allocated_dimensions();
        let target_rows = allocated_rows.max(self.rows);
        let target_columns = allocated_columns.max(self.columns);
        let type_count = self.type_count;
        self.chunks.resize_with(target_columns, Vec::new);
        for column in self.chunks.iter_mut() {
            column.resize_with(target_rows, || Chunk::with_type_capacity(type_count));
        }
    }

    /// Adds the particle at arena index `index` to the chunk its position buckets into.
    pub fn insert(&mut self, index: usize, particle: &Particle) {
        let (column, row) = self.chunk_index_of(particle.position);
        self.insert_at(index, particle.type_id as usize, column, row);
    }

    /// Removes arena index `index` from whichever chunk holds it.
    /// Returns false if it was not stored.
    pub fn remove(&mut self, index: usize, particle: &Particle) -> bool {
        match self.slots.get(index).copied().flatten() {
            Some(slot) => {
                self.remove_slot(slot, particle.type_id as usize);
                true
            }
            None => false,
        }
    }

    fn insert_at(&mut self, index: usize, type_id: usize, column: usize, row: usize) {
        if type_id >= self.type_count {
            self.ensure_type_capacity(type_id + 1);
        }
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        let chunk = &mut self.chunks[column][row];
        chunk.members.push(index);
        chunk.type_counts[type_id] += 1;
        self.slots[index] = Some(Slot { column, row, index: chunk.members.len() - 1 });
    }

    fn remove_slot(&mut self, slot: Slot, type_id: usize) {
        let chunk = &mut self.chunks[slot.column][slot.row];
        let removed = chunk.members.swap_remove(slot.index);
        if let Some(count) = chunk.type_counts.get_mut(type_id) {
            *count = count.saturating_sub(1);
        }
        // The last member moved into the freed slot
        if let Some(&moved) = chunk.members.get(slot.index) {
            self.slots[moved] = Some(Slot { index: slot.index, ..slot });
        }
        self.slots[removed] = None;
    }

    /// Moves every particle whose position no longer buckets into its stored chunk.
    /// Returns the number of particles moved.
    pub fn rehash(&mut self, particles: &[Particle]) -> usize {
        let mut moves = Vec::new();
        for (column, chunks) in self.chunks.iter().enumerate() {
            for (row, chunk) in chunks.iter().enumerate() {
                for &index in &chunk.members {
                    let destination = self.chunk_index_of(particles[index].position);
                    if destination != (column, row) {
                        moves.push((index, destination));
                    }
                }
            }
        }

        for &(index, (column, row)) in &moves {
            let type_id = particles[index].type_id as usize;
            if let Some(slot) = self.slots[index] {
                self.remove_slot(slot, type_id);
            }
            self.insert_at(index, type_id, column, row);
        }
        trace!("Rehash moved {} particles.", moves.len());
        moves.len()
    }

    /// Particles influencing `position`: every chunk whose center lies within
    /// `influence_radius` contributes its real particles if it is within
    /// `approximation_radius` or holds fewer than `minimum_amount_to_chunk` particles,
    /// otherwise one aggregate particle per type present at the chunk center.
    /// The chunk containing `position` always contributes real particles.
    /// Chunks outside the grid are skipped; the search does not wrap.
    pub fn neighborhood(
        &self,
        particles: &[Particle],
        position: Vec2,
        influence_radius: f32,
        approximation_radius: f32,
        minimum_amount_to_chunk: u32,
    ) -> Vec<Particle> {
        let mut out = Vec::new();
        self.neighborhood_into(
            particles,
            position,
            influence_radius,
            approximation_radius,
            minimum_amount_to_chunk,
            &mut out,
        );
        out
    }

    /// Same as [`SpatialGrid::neighborhood`], reusing `out` (cleared first).
    pub fn neighborhood_into(
        &self,
        particles: &[Particle],
        position: Vec2,
        influence_radius: f32,
        approximation_radius: f32,
        minimum_amount_to_chunk: u32,
        out: &mut Vec<Particle>,
    ) {
        out.clear();
        let reach = (influence_radius / self.chunk_size).ceil() as i64;
        let center_column = (position.x / self.chunk_size).floor() as i64;
        let center_row = (position.y / self.chunk_size).floor() as i64;
        let home = self.chunk_index_of(position);

        for column in (center_column - reach)..=(center_column + reach) {
            if column < 0 || column >= self.columns as i64 {
                continue;
            }
            for row in (center_row - reach)..=(center_row + reach) {
                if row < 0 || row >= self.rows as i64 {
                    continue;
                }
                let (column, row) = (column as usize, row as usize);
                let chunk = &self.chunks[column][row];
                if chunk.is_empty() {
                    continue;
                }
                let chunk_center = self.chunk_center(column, row);
                let distance = chunk_center.distance(position);
                if distance > influence_radius {
                    continue;
                }

                // the chunk holding the query point is never aggregated
                let is_home = (column, row) == home;
                if is_home || distance <= approximation_radius || chunk.particle_count() < minimum_amount_to_chunk {
                    out.extend(chunk.members.iter().map(|&index| particles[index]));
                } else {
                    out.extend(
                        chunk
                            .type_counts
                            .iter()
                            .enumerate()
                            .filter(|&(_, &count)| count > 0)
                            .map(|(type_id, &count)| Particle::aggregate(type_id as u32, chunk_center, count)),
                    );
                }
            }
        }
    }
}
