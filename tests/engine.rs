use particle_life::forces::{pair_force, toroidal_displacement};
use particle_life::grid::SpatialIndex;
use particle_life::integrator::integrate;
use particle_life::{InteractionMatrix, MatrixEdit, ParticleLifeSimulation, ParticleStore};
use rand::prelude::*;
use simulation_common::{BoundaryMode, ConfigError, ForceSymmetry, SimulationConfig, Vec2};

/// A small torus with a non-trivial asymmetric matrix.
pub fn test_config(count: u32, width: f32, height: f32) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.width = width;
    config.world.height = height;
    config.particles.count = count;
    config.particles.types = 3;
    config.particles.seed = 42;
    config.physics.radius_min = 8.0;
    config.physics.radius_max = 25.0;
    config.interaction.matrix = vec![
        vec![0.8, -0.4, 0.3],
        vec![0.2, 0.5, -0.9],
        vec![-0.6, 0.7, 0.1],
    ];
    config
}

fn brute_force_neighbors(store: &ParticleStore, idx: usize, radius: f32, width: f32, height: f32) -> Vec<u32> {
    let pos = store.position(idx);
    (0..store.len())
        .filter(|&j| j != idx)
        .filter(|&j| toroidal_displacement(pos, store.position(j), width, height).length_squared() < radius * radius)
        .map(|j| j as u32)
        .collect()
}

// ==================================================================================
// Determinism
// ==================================================================================

#[test]
fn identical_seeds_give_identical_trajectories() {
    let mut a = ParticleLifeSimulation::new(test_config(400, 300.0, 200.0)).unwrap();
    let mut b = ParticleLifeSimulation::new(test_config(400, 300.0, 200.0)).unwrap();
    for _ in 0..200 {
        a.step();
        b.step();
    }
    assert_eq!(a.particles().positions_x, b.particles().positions_x);
    assert_eq!(a.particles().positions_y, b.particles().positions_y);
    assert_eq!(a.particles().velocities_x, b.particles().velocities_x);
    assert_eq!(a.particles().velocities_y, b.particles().velocities_y);
}

// ==================================================================================
// Conservation in symmetric mode
// ==================================================================================

#[test]
fn symmetric_forces_conserve_total_velocity() {
    let mut config = test_config(300, 200.0, 200.0);
    config.physics.force_symmetry = ForceSymmetry::Symmetric;
    config.physics.friction = 0.0;
    config.physics.max_velocity = 1.0e6;
    let mut sim = ParticleLifeSimulation::new(config).unwrap();

    for _ in 0..5 {
        sim.step();
        let p = sim.particles();
        let total_vx: f32 = p.velocities_x.iter().sum();
        let total_vy: f32 = p.velocities_y.iter().sum();
        assert!(total_vx.abs() < 1e-2, "sum vx drifted to {}", total_vx);
        assert!(total_vy.abs() < 1e-2, "sum vy drifted to {}", total_vy);
        // Something actually moved
        assert!(p.max_speed() > 0.0);
    }
}

// ==================================================================================
// Boundary handling
// ==================================================================================

#[test]
fn particle_leaving_far_corner_reappears_near_origin() {
    let mut config = test_config(10, 100.0, 80.0);
    config.physics.friction = 0.0;
    config.physics.delta_time = 1.0;
    let params = config.get_sim_params();
    let (pos, _) = integrate(Vec2::new(99.9, 79.9), Vec2::new(1.0, 1.0), Vec2::zero(), &params);
    assert!((pos.x - 0.9).abs() < 1e-3);
    assert!((pos.y - 0.9).abs() < 1e-3);
}

#[test]
fn bounce_mode_keeps_particles_inside_walls() {
    let mut config = test_config(300, 150.0, 120.0);
    config.world.boundary = BoundaryMode::Bounce;
    let mut sim = ParticleLifeSimulation::new(config).unwrap();
    for _ in 0..300 {
        sim.step();
    }
    let p = sim.particles();
    for i in 0..p.len() {
        let pos = p.position(i);
        assert!((0.0..=150.0).contains(&pos.x), "x = {}", pos.x);
        assert!((0.0..=120.0).contains(&pos.y), "y = {}", pos.y);
    }
}

// ==================================================================================
// Neighbor index vs brute force
// ==================================================================================

#[test]
fn grid_neighbors_match_brute_force_with_edge_and_corner_particles() {
    let (width, height, radius) = (210.0, 160.0, 25.0);
    let mut store = ParticleStore::from_seed(600, 2, 7, width, height).unwrap();

    // Pin particles onto every edge and corner, and onto the last (narrower) column/row
    let pinned = [
        (0.0, 0.0),
        (209.99, 0.5),
        (0.2, 159.9),
        (209.5, 159.5),
        (105.0, 0.1),
        (105.0, 159.95),
        (0.05, 80.0),
        (209.95, 80.0),
        (195.0, 150.0),
        (12.0, 12.0),
        (24.99, 135.01),
        (185.01, 24.99),
    ];
    for (i, &(x, y)) in pinned.iter().enumerate() {
        store.positions_x[i] = x;
        store.positions_y[i] = y;
    }

    let grid_dim_x = (width / radius).ceil() as u32;
    let grid_dim_y = (height / radius).ceil() as u32;
    let mut index = SpatialIndex::new(radius, grid_dim_x, grid_dim_y, width, height, true);
    index.rebuild(&store.positions_x, &store.positions_y);

    let mut candidates = Vec::new();
    for i in 0..store.len() {
        let pos = store.position(i);
        let (cx, cy) = index.cell_of(pos);
        index.neighbors_of(cx, cy, &mut candidates);
        let found: Vec<u32> = candidates
            .iter()
            .copied()
            .filter(|&j| j as usize != i)
            .filter(|&j| {
                toroidal_displacement(pos, store.position(j as usize), width, height).length_squared() < radius * radius
            })
            .collect();
        let expected = brute_force_neighbors(&store, i, radius, width, height);
        assert_eq!(found, expected, "neighbor mismatch for particle {} at {:?}", i, pos);
    }
}

#[test]
fn engine_neighbors_match_brute_force_on_randomized_runs() {
    for seed in [1u64, 2, 3] {
        let mut config = test_config(500, 150.0, 110.0);
        config.particles.seed = seed;
        let mut sim = ParticleLifeSimulation::new(config).unwrap();
        for _ in 0..20 {
            sim.step();
        }
        sim.rebuild_index();
        let params = sim.params().clone();
        for i in 0..sim.particles().len() {
            let expected = brute_force_neighbors(
                sim.particles(),
                i,
                params.radius_max,
                params.world_width,
                params.world_height,
            );
            assert_eq!(sim.neighbors_within(i), expected, "seed {} particle {}", seed, i);
        }
    }
}

#[test]
fn tiny_world_does_not_double_count_neighbors() {
    // Two cells across: every ghost shares a 3x3 block with its primary entry
    let mut config = test_config(40, 50.0, 50.0);
    config.physics.radius_min = 5.0;
    config.physics.radius_max = 26.0;
    let mut sim = ParticleLifeSimulation::new(config).unwrap();
    sim.rebuild_index();
    let params = sim.params().clone();
    for i in 0..sim.particles().len() {
        let expected = brute_force_neighbors(sim.particles(), i, 26.0, params.world_width, params.world_height);
        assert_eq!(sim.neighbors_within(i), expected);
    }
}

// ==================================================================================
// Force model
// ==================================================================================

#[test]
fn force_is_exactly_zero_beyond_cutoff() {
    let config = test_config(10, 300.0, 200.0);
    let params = config.get_sim_params();
    let matrix = InteractionMatrix::from_rows(&config.interaction.matrix).unwrap();
    let mut rng = StdRng::seed_from_u64(99);

    let mut checked = 0;
    while checked < 2000 {
        let a = Vec2::new(rng.random_range(0.0..300.0), rng.random_range(0.0..200.0));
        let b = Vec2::new(rng.random_range(0.0..300.0), rng.random_range(0.0..200.0));
        let d = toroidal_displacement(a, b, 300.0, 200.0);
        if d.length() < params.radius_max {
            continue;
        }
        let (ta, tb) = (rng.random_range(0..3u32), rng.random_range(0..3u32));
        assert_eq!(pair_force(ta, tb, d, &params, &matrix), Vec2::zero());
        checked += 1;
    }
}

// ==================================================================================
// Speed cap
// ==================================================================================

#[test]
fn no_particle_exceeds_max_velocity() {
    let mut config = test_config(800, 120.0, 120.0);
    config.physics.repulsion_strength = 500.0;
    config.physics.max_velocity = 2.0;
    config.physics.friction = 0.0;
    let mut sim = ParticleLifeSimulation::new(config).unwrap();
    sim.randomize_interaction_matrix();
    for _ in 0..50 {
        sim.step();
        assert!(sim.particles().max_speed() <= 2.0 + 1e-4);
    }
}

// ==================================================================================
// Configuration validation
// ==================================================================================

#[test]
fn two_by_three_matrix_is_rejected_for_three_types() {
    let mut config = test_config(10, 100.0, 100.0);
    config.interaction.matrix = vec![vec![0.0, 0.1, 0.2], vec![0.3, 0.4, 0.5]];
    let err = ParticleLifeSimulation::new(config).err().expect("construction must fail");
    assert_eq!(
        err.downcast_ref::<ConfigError>(),
        Some(&ConfigError::MatrixShape { expected: 3, rows: 2, cols: 3 })
    );
}

#[test]
fn inverted_radii_are_rejected() {
    let mut config = test_config(10, 100.0, 100.0);
    config.physics.radius_min = 30.0;
    config.physics.radius_max = 20.0;
    let err = ParticleLifeSimulation::new(config).err().expect("construction must fail");
    assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::InvalidRadii { .. })));
}

// ==================================================================================
// Matrix edits
// ==================================================================================

#[test]
fn matrix_edits_take_effect_on_next_step() {
    let mut untouched = ParticleLifeSimulation::new(test_config(500, 200.0, 200.0)).unwrap();
    let mut edited = ParticleLifeSimulation::new(test_config(500, 200.0, 200.0)).unwrap();
    edited.apply_matrix_edit(MatrixEdit::Reset).unwrap();
    edited.apply_matrix_edit(MatrixEdit::Set { row: 0, col: 0, value: -1.0 }).unwrap();
    edited.apply_matrix_edit(MatrixEdit::Adjust { row: 2, col: 1, delta: 5.0 }).unwrap();
    assert_eq!(edited.interaction_matrix().get(2, 1), 1.0);

    untouched.step();
    edited.step();
    assert_ne!(untouched.net_forces(), edited.net_forces());
}

// ==================================================================================
// Scenario
// ==================================================================================

#[test]
fn repulsion_only_population_stays_bounded_and_slows_down() {
    let mut config = SimulationConfig::default();
    config.world.width = 500.0;
    config.world.height = 500.0;
    config.particles.count = 100;
    config.particles.types = 3;
    config.particles.seed = 42;
    config.physics.radius_min = 10.0;
    config.physics.radius_max = 50.0;
    config.physics.repulsion_strength = 1.0;
    config.physics.friction = 0.05;
    config.physics.max_velocity = 5.0;
    config.physics.delta_time = 0.1;
    config.interaction.matrix = vec![vec![0.0; 3]; 3];

    let mut sim = ParticleLifeSimulation::new(config).unwrap();
    for _ in 0..1000 {
        sim.step();
        let p = sim.particles();
        for i in 0..p.len() {
            let pos = p.position(i);
            assert!((0.0..500.0).contains(&pos.x), "x = {} at step {}", pos.x, sim.current_time_step());
            assert!((0.0..500.0).contains(&pos.y), "y = {} at step {}", pos.y, sim.current_time_step());
        }
    }
    let mean_speed = sim.particles().mean_speed();
    assert!(mean_speed < 0.5 * 5.0, "mean speed {} did not settle", mean_speed);
}
