use crate::config::{BoundaryMode, ForceSymmetry};
use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // World & Grid
    pub world_width: f32,
    pub world_height: f32,
    pub boundary: BoundaryMode,
    pub grid_cell_size: f32,
    pub inv_grid_cell_size: f32,
    pub grid_dim_x: u32,
    pub grid_dim_y: u32,
    pub num_grid_cells: u32,

    // Time
    pub dt: f32,

    // Particles
    pub num_particles: u32,
    pub num_types: u32,

    // Force model
    pub radius_min: f32,
    pub radius_max: f32,
    pub radius_max_sq: f32,
    pub ideal_radius: f32, // Peak of the triangular attraction profile
    pub half_band: f32,    // ideal_radius - radius_min
    pub repulsion_strength: f32,
    pub force_symmetry: ForceSymmetry,

    // Integrator
    pub friction: f32,
    pub max_velocity: f32,
    pub damping_threshold: f32, // 0 disables stiction
}

impl SimParams {
    /// Ghost duplication is only meaningful when opposite edges are identified.
    #[inline(always)]
    pub fn uses_ghost_cells(&self) -> bool {
        self.boundary == BoundaryMode::Wrap
    }
}
