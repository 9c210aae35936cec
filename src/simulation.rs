use crate::forces::{displacement, pair_force};
use crate::grid::SpatialIndex;
use crate::integrator::integrate;
use crate::interaction::{InteractionMatrix, MatrixEdit};
use crate::particles::ParticleStore;
use anyhow::Result;
use log::{debug, info, trace, warn};
use rand::prelude::*;
use rayon::prelude::*;
use simulation_common::{SimParams, SimulationConfig, Snapshot, Vec2};

/// Manages the state and execution of the particle life simulation on the CPU.
pub struct ParticleLifeSimulation {
    /// The simulation configuration the engine was built from.
    config: SimulationConfig,
    /// Runtime parameters derived from `config`.
    params: SimParams,
    /// Positions, velocities and types of every particle.
    particles: ParticleStore,
    /// Engine-owned interaction strengths; edited only between steps.
    matrix: InteractionMatrix,
    /// Uniform grid rebuilt at the start of every step.
    grid: SpatialIndex,
    /// Seeded generator shared by initial placement and matrix randomization.
    rng: StdRng,
    /// The number of completed steps.
    current_time_step: u32,
    /// Net force on each particle from the last force pass.
    net_forces: Vec<Vec2>,
    /// Stores collected simulation data snapshots at record intervals.
    recorded_snapshots: Vec<Snapshot>,
}

const MAX_EXPECTED_NEIGHBORS: usize = 64; // Histogram size; denser particles land in the last bin

impl ParticleLifeSimulation {
    /// Validates the configuration, seeds the generator and places all particles.
    /// Fails on any configuration error instead of running with undefined geometry.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(config.particles.seed);
        let particles = ParticleStore::initialize(
            config.particles.count,
            config.particles.types,
            &mut rng,
            config.world.width,
            config.world.height,
        )?;
        let matrix = InteractionMatrix::for_types(config.particles.types, &config.interaction.matrix)?;

        let params = config.get_sim_params();
        let grid = SpatialIndex::from_params(&params);
        info!(
            "Spatial grid: {}x{} cells of size {:.2} ({:?} boundary, {:?} forces).",
            params.grid_dim_x, params.grid_dim_y, params.grid_cell_size, params.boundary, params.force_symmetry
        );
        if params.grid_dim_x < 3 || params.grid_dim_y < 3 {
            warn!(
                "World ({}x{}) is less than three interaction radii across; every particle scans the whole grid.",
                params.world_width, params.world_height
            );
        }

        let net_forces = vec![Vec2::zero(); particles.len()];
        Ok(Self {
            config,
            params,
            particles,
            matrix,
            grid,
            rng,
            current_time_step: 0,
            net_forces,
            recorded_snapshots: Vec::new(),
        })
    }

    /// Advances the simulation by one time step (`dt`).
    ///
    /// Every net force is computed from the positions at the start of the step
    /// before any particle moves, so no particle observes another's update.
    pub fn step(&mut self) {
        // --- 1. Build Spatial Grid ---
        self.rebuild_index();

        // --- 2. Accumulate Forces (Parallel) ---
        self.compute_forces_parallel();

        // --- 3. Integrate (Parallel) ---
        self.integrate_parallel();

        self.current_time_step += 1;
        trace!("Completed step {}.", self.current_time_step);
    }

    /// Rebuilds the spatial index from the current positions.
    pub fn rebuild_index(&mut self) {
        self.grid.rebuild(&self.particles.positions_x, &self.particles.positions_y);
    }

    fn compute_forces_parallel(&mut self) {
        // Capture fields separately so the force buffer can be borrowed mutably.
        let particles = &self.particles;
        let grid = &self.grid;
        let params = &self.params;
        let matrix = &self.matrix;

        self.net_forces.par_iter_mut().enumerate().for_each_init(
            || Vec::with_capacity(64),
            |scratch, (idx, force_out)| {
                *force_out = net_force(idx, particles, grid, params, matrix, scratch);
            },
        );
    }

    fn integrate_parallel(&mut self) {
        let params = &self.params;
        let forces = &self.net_forces;
        let particles = &mut self.particles;

        particles
            .positions_x
            .par_iter_mut()
            .zip(particles.positions_y.par_iter_mut())
            .zip(particles.velocities_x.par_iter_mut())
            .zip(particles.velocities_y.par_iter_mut())
            .zip(forces.par_iter())
            .for_each(|((((pos_x, pos_y), vel_x), vel_y), &force)| {
                let (pos, vel) =
                    integrate(Vec2::new(*pos_x, *pos_y), Vec2::new(*vel_x, *vel_y), force, params);
                *pos_x = pos.x;
                *pos_y = pos.y;
                *vel_x = vel.x;
                *vel_y = vel.y;
            });
    }

    /// Indices of all other particles within `radius_max` of particle `idx`,
    /// ascending, as seen by the index at its last rebuild.
    pub fn neighbors_within(&self, idx: usize) -> Vec<u32> {
        let mut candidates = Vec::new();
        let pos = self.particles.position(idx);
        let (cell_x, cell_y) = self.grid.cell_of(pos);
        self.grid.neighbors_of(cell_x, cell_y, &mut candidates);
        candidates.retain(|&j| {
            j as usize != idx
                && displacement(pos, self.particles.position(j as usize), &self.params).length_squared()
                    < self.params.radius_max_sq
        });
        candidates
    }

    // --- Interaction matrix ---

    pub fn interaction_matrix(&self) -> &InteractionMatrix {
        &self.matrix
    }

    /// Applies one external edit; takes effect on the next `step()`.
    pub fn apply_matrix_edit(&mut self, edit: MatrixEdit) -> Result<()> {
        self.matrix.apply(edit, &mut self.rng)?;
        debug!("Applied matrix edit {:?}.", edit);
        Ok(())
    }

    /// Sets one cell, clamping the value into `[-1, 1]`.
    pub fn set_interaction_value(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        self.apply_matrix_edit(MatrixEdit::Set { row, col, value })
    }

    /// Replaces the whole matrix. The shape must still match the type count.
    pub fn set_interaction_matrix(&mut self, rows: &[Vec<f32>]) -> Result<()> {
        self.matrix = InteractionMatrix::for_types(self.params.num_types, rows)?;
        debug!("Interaction matrix replaced.");
        Ok(())
    }

    pub fn randomize_interaction_matrix(&mut self) {
        self.matrix.randomize(&mut self.rng);
        debug!("Interaction matrix randomized: {:?}", self.matrix.rows());
    }

    pub fn reset_interaction_matrix(&mut self) {
        self.matrix.reset();
        debug!("Interaction matrix reset to zero.");
    }

    // --- Read access for collaborators ---

    pub fn particles(&self) -> &ParticleStore {
        &self.particles
    }

    /// Net forces from the most recent step, one per particle.
    pub fn net_forces(&self) -> &[Vec2] {
        &self.net_forces
    }

    pub fn current_particle_count(&self) -> u32 {
        self.particles.len() as u32
    }

    pub fn current_time_step(&self) -> u32 {
        self.current_time_step
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    // --- Snapshots ---

    /// Number of neighbors within `radius_max` for every particle.
    fn calculate_neighbor_counts_parallel(&self) -> Vec<u32> {
        (0..self.particles.len())
            .into_par_iter()
            .map(|idx| self.neighbors_within(idx).len() as u32)
            .collect()
    }

    /// Records aggregate statistics for the current state.
    pub fn record_snapshot(&mut self) {
        // Positions moved since the last step's rebuild
        self.rebuild_index();

        let num_particles = self.particles.len();
        let mut neighbor_counts_distribution = vec![0u32; MAX_EXPECTED_NEIGHBORS];
        let mut overflow = 0;
        for count in self.calculate_neighbor_counts_parallel() {
            let bin = (count as usize).min(MAX_EXPECTED_NEIGHBORS - 1);
            if count as usize >= MAX_EXPECTED_NEIGHBORS {
                overflow += 1;
            }
            neighbor_counts_distribution[bin] += 1;
        }
        if overflow > 0 {
            warn!(
                "{} particles have more than {} neighbors; counted in the last histogram bin.",
                overflow,
                MAX_EXPECTED_NEIGHBORS - 1
            );
        }

        let (positions, types) = if self.config.output.save_positions_in_snapshot {
            (Some(self.particles.positions()), Some(self.particles.types.clone()))
        } else {
            (None, None)
        };

        let snapshot = Snapshot {
            step: self.current_time_step,
            time: self.current_time_step as f32 * self.params.dt,
            total_particle_count: num_particles as u32,
            mean_speed: self.particles.mean_speed(),
            max_speed: self.particles.max_speed(),
            type_counts: self.particles.type_counts(self.params.num_types),
            neighbor_counts_distribution,
            positions,
            types,
        };
        debug!(
            "Snapshot at step {}: mean speed {:.4}, max speed {:.4}.",
            snapshot.step, snapshot.mean_speed, snapshot.max_speed
        );
        self.recorded_snapshots.push(snapshot);
    }

    /// Provides access to the recorded snapshots.
    pub fn get_recorded_snapshots(&self) -> &[Snapshot] {
        &self.recorded_snapshots
    }
}

/// Sum of pair forces on particle `idx` from every neighbor the grid reports.
/// `scratch` is reused across calls to avoid per-particle allocation.
fn net_force(
    idx: usize,
    particles: &ParticleStore,
    grid: &SpatialIndex,
    params: &SimParams,
    matrix: &InteractionMatrix,
    scratch: &mut Vec<u32>,
) -> Vec2 {
    let pos = particles.position(idx);
    let self_type = particles.types[idx];
    let (cell_x, cell_y) = grid.cell_of(pos);
    grid.neighbors_of(cell_x, cell_y, scratch);

    let mut force = Vec2::zero();
    for &neighbor_idx in scratch.iter() {
        let neighbor_idx = neighbor_idx as usize;
        if neighbor_idx == idx {
            continue;
        }
        let d = displacement(pos, particles.position(neighbor_idx), params);
        force += pair_force(self_type, particles.types[neighbor_idx], d, params, matrix);
    }
    force
}
