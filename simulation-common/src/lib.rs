pub mod config;
pub mod error;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use config::{
    BoundaryMode, ForceSymmetry, InteractionConfig, OutputConfig, ParticlesConfig, PhysicsConfig,
    RunConfig, SimulationConfig, WorldConfig,
};
pub use error::ConfigError;
pub use sim_params::SimParams;
pub use snapshot::Snapshot;
pub use vecmath::Vec2;
