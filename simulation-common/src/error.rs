//! Configuration errors.
//!
//! Every way a configuration can be rejected at construction time has its own
//! variant, so callers can tell a malformed interaction matrix apart from a
//! degenerate world without parsing messages.

use std::fmt;

/// Errors raised while validating a [`SimulationConfig`](crate::SimulationConfig).
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `particles.count` was zero.
    NoParticles,
    /// `particles.types` was zero.
    NoParticleTypes,
    /// The interaction matrix is not `types x types`.
    MatrixShape {
        expected: usize,
        rows: usize,
        /// Column count of the first row whose length differs from `expected`,
        /// or of the first row when only the row count is wrong.
        cols: usize,
    },
    /// `radius_min` must be positive and strictly smaller than `radius_max`.
    InvalidRadii { radius_min: f32, radius_max: f32 },
    /// World dimensions must be finite and positive.
    InvalidWorld { width: f32, height: f32 },
    /// A scalar physics parameter is outside its valid range.
    InvalidParameter { name: &'static str, value: f32, expected: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoParticles => write!(f, "particles.count must be greater than 0"),
            ConfigError::NoParticleTypes => write!(f, "particles.types must be greater than 0"),
            ConfigError::MatrixShape { expected, rows, cols } => write!(
                f,
                "interaction matrix shape ({}, {}) does not match particle types ({}); \
                 the matrix must be square with one row and column per type",
                rows, cols, expected
            ),
            ConfigError::InvalidRadii { radius_min, radius_max } => write!(
                f,
                "interaction radii must satisfy 0 < radius_min < radius_max (got radius_min={}, radius_max={})",
                radius_min, radius_max
            ),
            ConfigError::InvalidWorld { width, height } => write!(
                f,
                "world dimensions must be positive (got {}x{})",
                width, height
            ),
            ConfigError::InvalidParameter { name, value, expected } => {
                write!(f, "{} = {} is invalid: expected {}", name, value, expected)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
