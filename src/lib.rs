//! Particle life: typed particles attracting and repelling each other on a torus.
//!
//! [`ParticleLifeSimulation`] owns the particles, the interaction matrix and a
//! uniform spatial grid, and advances everything one step at a time. Driving
//! loops read state through its accessors and edit the matrix between steps.

pub mod forces;
pub mod grid;
pub mod integrator;
pub mod interaction;
pub mod output;
pub mod particles;
pub mod simulation;

pub use interaction::{InteractionMatrix, MatrixEdit};
pub use particles::ParticleStore;
pub use simulation::ParticleLifeSimulation;
