use particle_life_engine::{
    create_random_population, Organism, OrganismTemplate, Particle, SimParams, Simulator, Vec2,
};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Parameters for a small world with two types per organism
pub fn test_params(width: f32, height: f32) -> SimParams {
    SimParams {
        types_per_organism: 2,
        ..SimParams::with_bounds(width, height)
    }
}

/// Simulator seeded with `organisms` random organisms of `particles` particles each
pub fn seeded_simulator(params: SimParams, organisms: usize, particles: usize, seed: u64) -> Simulator {
    let template = OrganismTemplate {
        particle_count: particles,
        type_count: params.types_per_organism as usize,
        spawn_spread: 80.0,
        self_cohesion: 0.1,
    };
    let cap = params.max_population as usize;
    let mut sim = Simulator::with_params(params).expect("valid params");
    let mut rng = StdRng::seed_from_u64(seed);
    let population = create_random_population(organisms, cap, &template, &mut rng).expect("population");
    sim.add_organisms(population).expect("registered");
    sim
}

/// Organism with the given local types and offsets, and flat matrices
pub fn fixed_organism(spots: &[(u32, f32, f32)], internal: f32, external: f32) -> Organism {
    let particles = spots
        .iter()
        .map(|&(t, x, y)| Particle::new(t, Vec2::new(x, y)))
        .collect();
    Organism::new(particles, vec![vec![internal; 2]; 2], vec![vec![external; 2]; 2]).expect("valid organism")
}

fn assert_inside_world(sim: &Simulator) {
    let bounds = sim.bounds();
    for p in sim.particles() {
        assert!(
            p.position.x >= 0.0 && p.position.x < bounds.x && p.position.y >= 0.0 && p.position.y < bounds.y,
            "particle {} at {:?} outside {:?}",
            p.id,
            p.position,
            bounds
        );
    }
}

fn assert_grid_consistent(sim: &Simulator) {
    let chunk_size = sim.chunk_size();
    for (index, p) in sim.particles().iter().enumerate() {
        let expected = (
            (p.position.x / chunk_size).floor() as usize,
            (p.position.y / chunk_size).floor() as usize,
        );
        assert_eq!(
            sim.grid().member_chunk(index),
            Some(expected),
            "particle {} at {:?} stored in the wrong chunk",
            index,
            p.position
        );
    }
    assert_eq!(sim.grid().particle_count(), sim.particle_count());
}

// ==================================================================================
// Step invariants
// ==================================================================================

#[test]
fn particles_stay_inside_the_torus() {
    let mut sim = seeded_simulator(test_params(600.0, 400.0), 6, 60, 1);
    for _ in 0..40 {
        sim.step();
        assert_inside_world(&sim);
    }
}

#[test]
fn step_conserves_particle_count() {
    let mut sim = seeded_simulator(test_params(600.0, 400.0), 5, 50, 2);
    let before = sim.get_all_particles().len();
    for _ in 0..25 {
        sim.step();
    }
    assert_eq!(sim.get_all_particles().len(), before);
    let mut ids: Vec<u32> = sim.get_all_particles().iter().map(|p| p.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (0..before as u32).collect::<Vec<_>>());
}

#[test]
fn grid_membership_matches_positions_after_step() {
    let mut sim = seeded_simulator(test_params(500.0, 500.0), 4, 80, 3);
    for _ in 0..30 {
        sim.step();
        assert_grid_consistent(&sim);
    }
}

#[test]
fn speed_never_exceeds_the_limit() {
    let mut sim = seeded_simulator(test_params(500.0, 500.0), 4, 80, 4);
    let max_speed = sim.params().max_speed;
    for _ in 0..20 {
        sim.step();
        for p in sim.particles() {
            assert!(p.speed() <= max_speed + 1e-4, "speed {} over {}", p.speed(), max_speed);
        }
    }
}

#[test]
fn step_result_does_not_depend_on_worker_count() {
    let single = SimParams { worker_threads: 1, ..test_params(500.0, 400.0) };
    let many = SimParams { worker_threads: 4, ..test_params(500.0, 400.0) };
    let mut a = seeded_simulator(single, 4, 60, 5);
    let mut b = seeded_simulator(many, 4, 60, 5);
    for _ in 0..10 {
        a.step();
        b.step();
    }
    assert_eq!(a.get_all_particles(), b.get_all_particles());
}

#[test]
fn step_without_particles_only_ticks() {
    let mut sim = Simulator::new(300.0, 200.0).expect("valid size");
    sim.step();
    assert_eq!(sim.tick(), 1);
    assert_eq!(sim.compute_average_kinetic_energy(), 0.0);
}

// ==================================================================================
// Force law
// ==================================================================================

#[test]
fn overlapping_same_type_particles_repel_along_x() {
    let sim = Simulator::with_params(test_params(200.0, 200.0)).expect("valid params");
    let d = 4.0;
    let a = Particle::new(0, Vec2::new(50.0, 50.0));
    let b = Particle::new(0, Vec2::new(50.0 + d, 50.0));
    let params = sim.params().clone();
    let expected = params.repulsion_gain * (params.repulsion_radius - d) * params.universal_force_multiplier;

    let on_a = sim.compute_force(&a, &b);
    let on_b = sim.compute_force(&b, &a);
    assert!(on_a.x < 0.0 && on_a.y.abs() < 1e-6, "force on a: {:?}", on_a);
    assert!(on_b.x > 0.0 && on_b.y.abs() < 1e-6, "force on b: {:?}", on_b);
    assert!((on_a.length() - expected).abs() < 1e-5);
    assert!((on_b.length() - expected).abs() < 1e-5);
}

#[test]
fn self_cohesion_does_not_act_inside_repulsion_radius() {
    let mut sim = Simulator::with_params(test_params(200.0, 200.0)).expect("valid params");
    let organism = fixed_organism(&[(0, -2.0, 0.0), (0, 2.0, 0.0)], 0.1, -0.5);
    sim.add_organism(organism, Vec2::new(100.0, 100.0)).expect("registered");
    assert_eq!(sim.influence(0, 0), 0.1);

    let ps = sim.particles();
    let d = ps[0].position.distance(ps[1].position);
    assert!((d - 4.0).abs() < 1e-5);
    let params = sim.params().clone();
    let expected = params.repulsion_gain * (params.repulsion_radius - d) * params.universal_force_multiplier;
    let force = sim.compute_force(&ps[0], &ps[1]);
    assert!((force.length() - expected).abs() < 1e-5, "got {} expected {}", force.length(), expected);
    assert!(force.x < 0.0);
}

#[test]
fn repulsion_scales_with_universal_multiplier() {
    let params = SimParams { universal_force_multiplier: 2.5, ..test_params(200.0, 200.0) };
    let sim = Simulator::with_params(params).expect("valid params");
    let a = Particle::new(0, Vec2::new(50.0, 50.0));
    let b = Particle::new(0, Vec2::new(52.0, 50.0));
    let expected = 0.25 * (10.0 - 2.0) * 2.5;
    assert!((sim.compute_force(&a, &b).length() - expected).abs() < 1e-5);
}

#[test]
fn asymmetric_matrix_gives_asymmetric_forces() {
    let mut sim = Simulator::with_params(test_params(400.0, 400.0)).expect("valid params");
    sim.set_influence(0, 1, 0.8);
    sim.set_influence(1, 0, -0.2);
    let a = Particle::new(0, Vec2::new(100.0, 100.0));
    let b = Particle::new(1, Vec2::new(150.0, 100.0));
    let distance: f32 = 50.0;
    let gap = sim.influence_radius() - distance;

    let on_a = sim.compute_force(&a, &b);
    let on_b = sim.compute_force(&b, &a);
    assert!((on_a.length() - 0.8 / gap).abs() < 1e-6);
    assert!((on_b.length() - 0.2 / gap).abs() < 1e-6);
    // a is pulled toward b, b is pushed away from a: both point +x
    assert!(on_a.x > 0.0);
    assert!(on_b.x > 0.0);
    assert!((on_a + on_b).length() > 1e-3, "forces cancelled: {:?} {:?}", on_a, on_b);
}

#[test]
fn coincident_particles_produce_no_force_or_nan() {
    let mut sim = Simulator::with_params(test_params(200.0, 200.0)).expect("valid params");
    let organism = fixed_organism(&[(0, 0.0, 0.0), (1, 0.0, 0.0)], 0.5, -0.5);
    sim.add_organism(organism, Vec2::new(100.0, 100.0)).expect("registered");

    let ps = sim.get_all_particles();
    assert_eq!(sim.compute_force(&ps[0], &ps[1]), Vec2::zero());

    sim.step();
    for p in sim.particles() {
        assert!(p.position.x.is_finite() && p.position.y.is_finite());
        assert!(p.velocity.x.is_finite() && p.velocity.y.is_finite());
    }
}

// ==================================================================================
// Spatial grid through the simulator
// ==================================================================================

#[test]
fn aggregated_masses_match_chunk_type_counts() {
    let params = SimParams {
        influence_radius: 200.0,
        approximation_radius: 60.0,
        minimum_amount_to_chunk: 8,
        ..test_params(400.0, 400.0)
    };
    let mut sim = Simulator::with_params(params).expect("valid params");
    let spots: Vec<(u32, f32, f32)> = (0..20)
        .map(|i| ((i % 3 == 0) as u32, (i % 5) as f32 * 2.0 - 4.0, (i / 5) as f32 * 2.0 - 3.0))
        .collect();
    sim.add_organism(fixed_organism(&spots, 0.1, -0.5), Vec2::new(275.0, 75.0)).expect("registered");

    let column_row = sim.grid().chunk_index_of(Vec2::new(275.0, 75.0));
    assert_eq!(column_row, (5, 1));
    let chunk = sim.grid().chunk(5, 1).expect("chunk exists");
    assert_eq!(chunk.particle_count(), 20);

    let near = sim.get_neighborhood(Vec2::new(75.0, 75.0));
    assert!(!near.is_empty());
    assert!(near.iter().all(Particle::is_aggregate));
    for type_id in 0..2u32 {
        let mass: f32 = near.iter().filter(|p| p.type_id == type_id).map(|p| p.mass).sum();
        assert_eq!(mass, chunk.type_count(type_id as usize) as f32);
    }
    let total: f32 = near.iter().map(|p| p.mass).sum();
    assert_eq!(total, 20.0);
}

#[test]
fn lone_particle_never_feels_its_own_chunk() {
    let params = SimParams {
        approximation_radius: 0.0,
        minimum_amount_to_chunk: 1,
        ..test_params(200.0, 200.0)
    };
    let mut sim = Simulator::with_params(params).expect("valid params");
    sim.add_organism(fixed_organism(&[(0, 0.0, 0.0)], 0.1, -0.5), Vec2::new(110.0, 110.0)).expect("registered");

    let near = sim.get_neighborhood(Vec2::new(110.0, 110.0));
    assert_eq!(near.len(), 1);
    assert!(!near[0].is_aggregate());

    sim.step();
    let p = sim.particles()[0];
    assert_eq!(p.velocity, Vec2::zero());
    assert_eq!(p.position, Vec2::new(110.0, 110.0));
}

#[test]
fn nearby_query_returns_real_particles() {
    let mut sim = seeded_simulator(test_params(400.0, 400.0), 1, 30, 6);
    let center = sim.particles()[0].position;
    let near = sim.get_neighborhood(center);
    assert!(near.iter().any(|p| p.id == 0));
    sim.step();
    assert!(sim.get_neighborhood(sim.particles()[0].position).iter().any(|p| p.id == 0 && !p.is_aggregate()));
}

// ==================================================================================
// Resize
// ==================================================================================

#[test]
fn resize_round_trip_keeps_everyone_wrapped_and_bucketed() {
    let mut sim = seeded_simulator(test_params(400.0, 300.0), 4, 50, 7);
    let count = sim.particle_count();
    for _ in 0..5 {
        sim.step();
    }

    sim.update_size(900.0, 700.0).expect("valid size");
    assert_inside_world(&sim);
    assert_grid_consistent(&sim);

    sim.update_size(400.0, 300.0).expect("valid size");
    assert_inside_world(&sim);
    assert_grid_consistent(&sim);
    assert_eq!(sim.particle_count(), count);
    // backing storage keeps the grown size
    assert_eq!(sim.grid().allocated_dimensions(), (18, 14));
    assert_eq!(sim.grid().dimensions(), (8, 6));
}

#[test]
fn shrinking_the_world_wraps_particles_in() {
    let mut sim = seeded_simulator(test_params(800.0, 800.0), 4, 40, 8);
    sim.update_size(150.0, 120.0).expect("valid size");
    assert_inside_world(&sim);
    assert_grid_consistent(&sim);
    for _ in 0..10 {
        sim.step();
    }
    assert_inside_world(&sim);
    assert_grid_consistent(&sim);
    assert_eq!(sim.particle_count(), 160);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn proptest_invariants_hold_across_steps_and_resizes(
        seed in any::<u64>(),
        width in 120.0f32..700.0,
        height in 120.0f32..700.0,
        new_width in 60.0f32..900.0,
        new_height in 60.0f32..900.0,
        organisms in 1usize..5,
    ) {
        let mut sim = seeded_simulator(test_params(width, height), organisms, 25, seed);
        let count = sim.particle_count();
        for _ in 0..4 {
            sim.step();
        }
        sim.update_size(new_width, new_height).expect("valid size");
        for _ in 0..4 {
            sim.step();
        }

        let bounds = sim.bounds();
        let chunk_size = sim.chunk_size();
        prop_assert_eq!(sim.get_all_particles().len(), count);
        for (index, p) in sim.particles().iter().enumerate() {
            prop_assert!(p.position.x >= 0.0 && p.position.x < bounds.x);
            prop_assert!(p.position.y >= 0.0 && p.position.y < bounds.y);
            let expected = (
                (p.position.x / chunk_size).floor() as usize,
                (p.position.y / chunk_size).floor() as usize,
            );
            prop_assert_eq!(sim.grid().member_chunk(index), Some(expected));
        }
    }
}
