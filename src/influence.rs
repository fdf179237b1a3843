/// Square table of signed interaction strengths indexed by (source type, neighbor type).
///
/// Stored row-major in a flat vector; grows when organisms register new global types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfluenceMatrix {
    size: usize,
    values: Vec<f32>,
}

impl InfluenceMatrix {
    /// Creates a `size x size` matrix filled with zeros.
    pub fn new(size: usize) -> Self {
        InfluenceMatrix { size, values: vec![0.0; size * size] }
    }

    /// Interaction strength of `neighbor` on `source`. Out-of-range types have no influence.
    #[inline(always)]
    pub fn get(&self, source: usize, neighbor: usize) -> f32 {
        if source < self.size && neighbor < self.size {
            self.values[source * self.size + neighbor]
        } else {
            0.0
        }
    }

    /// Sets one entry, growing the matrix if either type is out of range.
    pub fn set(&mut self, source: usize, neighbor: usize, value: f32) {
        let needed = source.max(neighbor) + 1;
        if needed > self.size {
            self.grow(needed);
        }
        self.values[source * self.size + neighbor] = value;
    }

    /// Grows the matrix to `new_size`, keeping existing entries. Never shrinks.
    pub fn grow(&mut self, new_size: usize) {
        if new_size <= self.size {
            return;
        }
        let mut values = vec![0.0; new_size * new_size];
        for row in 0..self.size {
            let old_start = row * self.size;
            let new_start = row * new_size;
            values[new_start..new_start + self.size]
                .copy_from_slice(&self.values[old_start..old_start + self.size]);
        }
        self.size = new_size;
        self.values = values;
    }
}
