use particle_life_common::Vec2;

/// Id carried by synthetic aggregate particles; never assigned to a real particle.
pub const AGGREGATE_ID: u32 = u32::MAX;

/// A single simulated point.
///
/// Real particles always have `mass == 1.0`. The grid produces aggregate particles
/// standing in for every particle of one type in a distant chunk; their mass is the
/// number of particles they represent.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub id: u32,
    pub organism_id: u32,
    /// Local type while owned by an organism, global type once registered.
    pub type_id: u32,
    pub mass: f32,
    pub position: Vec2,
    pub velocity: Vec2,
}

impl Particle {
    /// Creates a real particle at rest.
    pub fn new(type_id: u32, position: Vec2) -> Self {
        Particle {
            id: 0,
            organism_id: 0,
            type_id,
            mass: 1.0,
            position,
            velocity: Vec2::zero(),
        }
    }

    /// Creates a synthetic particle representing `count` particles of `type_id`.
    pub fn aggregate(type_id: u32, position: Vec2, count: u32) -> Self {
        Particle {
            id: AGGREGATE_ID,
            organism_id: AGGREGATE_ID,
            type_id,
            mass: count as f32,
            position,
            velocity: Vec2::zero(),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.id == AGGREGATE_ID
    }

    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }
}

/// Wraps a coordinate into `[0, bound)` by repeated add/subtract of `bound`.
#[inline(always)]
pub fn wrap_coordinate(mut value: f32, bound: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    // Overflow guard for non-physical inputs; the loops below would not terminate
    // once `value` is large enough that subtracting `bound` no longer changes it.
    if value.abs() > bound * 1024.0 {
        value = value.rem_euclid(bound);
    }
    while value >= bound {
        value -= bound;
    }
    while value < 0.0 {
        value += bound;
    }
    // `-tiny + bound` can round up to exactly `bound` in f32
    if value >= bound {
        value = 0.0;
    }
    value
}

/// Wraps a position into the toroidal world `[0, bounds.x) x [0, bounds.y)`.
#[inline(always)]
pub fn wrap_position(position: Vec2, bounds: Vec2) -> Vec2 {
    Vec2::new(wrap_coordinate(position.x, bounds.x), wrap_coordinate(position.y, bounds.y))
}
