use serde::{Deserialize, Serialize};

/// Aggregate state of the particle population at one time step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of completed steps when the snapshot was taken.
    pub step: u32,
    /// Simulated time (`step * dt`).
    pub time: f32,
    pub total_particle_count: u32,
    pub mean_speed: f32,
    pub max_speed: f32,
    /// Particles per type; index is the type id.
    pub type_counts: Vec<u32>,
    /// `neighbor_counts_distribution[n]` is the number of particles with exactly
    /// `n` neighbors inside `radius_max`. The last bin collects everything above it.
    pub neighbor_counts_distribution: Vec<u32>,
    /// Raw positions and types, for an external renderer.
    /// Never skipped when `None`: bincode is not self-describing.
    pub positions: Option<Vec<(f32, f32)>>,
    pub types: Option<Vec<u32>>,
}
