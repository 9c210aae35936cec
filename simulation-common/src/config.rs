use crate::error::ConfigError;
use crate::sim_params::SimParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Topology of the world rectangle.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryMode {
    /// Opposite edges are identified (torus).
    #[default]
    Wrap,
    /// Walls reflect the velocity component that would leave the box.
    Bounce,
}

/// How the long-range interaction strength is picked for an ordered pair.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ForceSymmetry {
    /// `matrix[self][neighbor]`; pairs may push each other unequally.
    #[default]
    Asymmetric,
    /// Mean of `matrix[a][b]` and `matrix[b][a]`, so every pair obeys Newton's third law.
    Symmetric,
}

// World geometry
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorldConfig {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub boundary: BoundaryMode,
}

// Population and seeding
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticlesConfig {
    pub count: u32,
    pub types: u32,
    pub seed: u64,
}

// Force model and integrator settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PhysicsConfig {
    #[serde(default = "default_friction")]
    pub friction: f32,
    pub radius_min: f32,
    pub radius_max: f32,
    #[serde(default = "default_repulsion_strength")]
    pub repulsion_strength: f32,
    #[serde(default = "default_max_velocity")]
    pub max_velocity: f32,
    #[serde(default = "default_delta_time")]
    pub delta_time: f32,
    #[serde(default)]
    pub velocity_damping_threshold: f32,
    #[serde(default)]
    pub force_symmetry: ForceSymmetry,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InteractionConfig {
    /// Row `a`, column `b`: strength applied to a type-`a` particle by a type-`b` neighbor.
    pub matrix: Vec<Vec<f32>>,
}

// Driver loop settings (only read by the binary)
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    pub total_steps: u32,
    #[serde(default = "default_log_throttle_steps")]
    pub log_throttle_steps: u32,
    #[serde(default)]
    pub record_interval_steps: u32, // 0 = only the initial and final snapshot
}

// Configuration for output settings
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct OutputConfig {
    pub base_filename: String,
    pub save_stats: bool,
    #[serde(default)]
    pub save_stats_csv: bool,
    #[serde(default)]
    pub save_positions_in_snapshot: bool,
    pub format: Option<String>, // Output format: "json", "bincode", "messagepack"
}

fn default_friction() -> f32 {
    0.05
}

fn default_repulsion_strength() -> f32 {
    1.0
}

fn default_max_velocity() -> f32 {
    5.0
}

fn default_delta_time() -> f32 {
    0.1
}

fn default_log_throttle_steps() -> u32 {
    100
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            total_steps: 1000,
            log_throttle_steps: default_log_throttle_steps(),
            record_interval_steps: 0,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            base_filename: "particle_life".to_string(),
            save_stats: false,
            save_stats_csv: false,
            save_positions_in_snapshot: false,
            format: None,
        }
    }
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    pub world: WorldConfig,
    pub particles: ParticlesConfig,
    pub physics: PhysicsConfig,
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for SimulationConfig {
    /// A 1500x700 torus with 500 particles of 4 types and no long-range interaction.
    fn default() -> Self {
        let types = 4;
        SimulationConfig {
            world: WorldConfig { width: 1500.0, height: 700.0, boundary: BoundaryMode::Wrap },
            particles: ParticlesConfig { count: 500, types, seed: 42 },
            physics: PhysicsConfig {
                friction: default_friction(),
                radius_min: 10.0,
                radius_max: 50.0,
                repulsion_strength: default_repulsion_strength(),
                max_velocity: default_max_velocity(),
                delta_time: default_delta_time(),
                velocity_damping_threshold: 0.0,
                force_symmetry: ForceSymmetry::Asymmetric,
            },
            interaction: InteractionConfig { matrix: vec![vec![0.0; types as usize]; types as usize] },
            run: RunConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file and validates it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;

        log::info!("Loaded configuration from '{}'.", path_ref.display());
        Ok(config)
    }

    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything the engine relies on for well-defined geometry.
    /// Only shapes and ranges are checked; matrix values are clamped on use, not rejected.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.particles.count == 0 {
            return Err(ConfigError::NoParticles);
        }
        if self.particles.types == 0 {
            return Err(ConfigError::NoParticleTypes);
        }
        validate_matrix_shape(self.particles.types as usize, &self.interaction.matrix)?;

        let world = &self.world;
        if !(world.width.is_finite() && world.height.is_finite() && world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigError::InvalidWorld { width: world.width, height: world.height });
        }

        let p = &self.physics;
        if !(p.radius_min > 0.0 && p.radius_min < p.radius_max && p.radius_max.is_finite()) {
            return Err(ConfigError::InvalidRadii { radius_min: p.radius_min, radius_max: p.radius_max });
        }
        if !(0.0..1.0).contains(&p.friction) {
            return Err(ConfigError::InvalidParameter {
                name: "physics.friction",
                value: p.friction,
                expected: "a value in [0, 1)",
            });
        }
        if !(p.max_velocity > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "physics.max_velocity",
                value: p.max_velocity,
                expected: "a positive value",
            });
        }
        if !(p.delta_time > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "physics.delta_time",
                value: p.delta_time,
                expected: "a positive value",
            });
        }
        if !(p.repulsion_strength >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "physics.repulsion_strength",
                value: p.repulsion_strength,
                expected: "a non-negative value",
            });
        }
        if !(p.velocity_damping_threshold >= 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "physics.velocity_damping_threshold",
                value: p.velocity_damping_threshold,
                expected: "a non-negative value (0 disables it)",
            });
        }
        Ok(())
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let world_width = self.world.width;
        let world_height = self.world.height;
        let p = &self.physics;

        // Grid parameters: one cell spans the full interaction range
        let grid_cell_size = p.radius_max;
        let inv_grid_cell_size = if grid_cell_size > 1e-9 { 1.0 / grid_cell_size } else { 0.0 };
        let grid_dim_x = ((world_width * inv_grid_cell_size).ceil() as u32).max(1);
        let grid_dim_y = ((world_height * inv_grid_cell_size).ceil() as u32).max(1);
        let num_grid_cells = grid_dim_x * grid_dim_y;

        let ideal_radius = 0.5 * (p.radius_min + p.radius_max);

        SimParams {
            world_width,
            world_height,
            boundary: self.world.boundary,
            grid_cell_size,
            inv_grid_cell_size,
            grid_dim_x,
            grid_dim_y,
            num_grid_cells,
            dt: p.delta_time,
            num_particles: self.particles.count,
            num_types: self.particles.types,
            radius_min: p.radius_min,
            radius_max: p.radius_max,
            radius_max_sq: p.radius_max * p.radius_max,
            ideal_radius,
            half_band: ideal_radius - p.radius_min,
            repulsion_strength: p.repulsion_strength,
            force_symmetry: p.force_symmetry,
            friction: p.friction,
            max_velocity: p.max_velocity,
            damping_threshold: p.velocity_damping_threshold,
        }
    }
}

/// Fails unless `matrix` is exactly `types x types`.
pub fn validate_matrix_shape(types: usize, matrix: &[Vec<f32>]) -> std::result::Result<(), ConfigError> {
    let rows = matrix.len();
    let bad_row = matrix.iter().find(|row| row.len() != types);
    if rows != types || bad_row.is_some() {
        let cols = bad_row.or(matrix.first()).map_or(0, |row| row.len());
        return Err(ConfigError::MatrixShape { expected: types, rows, cols });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [world]
        width = 400.0
        height = 300.0

        [particles]
        count = 10
        types = 2
        seed = 7

        [physics]
        radius_min = 5.0
        radius_max = 20.0

        [interaction]
        matrix = [[0.5, -0.5], [1.0, 0.0]]
    "#;

    #[test]
    fn defaults_fill_optional_fields() {
        let config = SimulationConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.world.boundary, BoundaryMode::Wrap);
        assert_eq!(config.physics.force_symmetry, ForceSymmetry::Asymmetric);
        assert_eq!(config.physics.friction, 0.05);
        assert_eq!(config.physics.repulsion_strength, 1.0);
        assert_eq!(config.physics.max_velocity, 5.0);
        assert_eq!(config.physics.delta_time, 0.1);
        assert_eq!(config.physics.velocity_damping_threshold, 0.0);
        assert_eq!(config.run.log_throttle_steps, 100);
        assert!(!config.output.save_stats);
    }

    #[test]
    fn enums_parse_lowercase() {
        let text = MINIMAL
            .replace("height = 300.0", "height = 300.0\nboundary = \"bounce\"")
            .replace("radius_max = 20.0", "radius_max = 20.0\nforce_symmetry = \"symmetric\"");
        let config = SimulationConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.world.boundary, BoundaryMode::Bounce);
        assert_eq!(config.physics.force_symmetry, ForceSymmetry::Symmetric);
    }

    #[test]
    fn rejects_non_square_matrix() {
        let mut config = SimulationConfig::default();
        config.particles.types = 3;
        config.interaction.matrix = vec![vec![0.0; 3]; 2];
        assert_eq!(
            config.validate(),
            Err(ConfigError::MatrixShape { expected: 3, rows: 2, cols: 3 })
        );

        config.interaction.matrix = vec![vec![0.0; 3], vec![0.0; 2], vec![0.0; 3]];
        assert_eq!(
            config.validate(),
            Err(ConfigError::MatrixShape { expected: 3, rows: 3, cols: 2 })
        );
    }

    #[test]
    fn rejects_inverted_radii_and_empty_populations() {
        let mut config = SimulationConfig::default();
        config.physics.radius_min = 50.0;
        config.physics.radius_max = 50.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRadii { .. })));

        let mut config = SimulationConfig::default();
        config.particles.count = 0;
        assert_eq!(config.validate(), Err(ConfigError::NoParticles));

        let mut config = SimulationConfig::default();
        config.particles.types = 0;
        config.interaction.matrix.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoParticleTypes));
    }

    #[test]
    fn rejects_out_of_range_scalars() {
        let mut config = SimulationConfig::default();
        config.physics.friction = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidParameter { name: "physics.friction", .. })
        ));

        let mut config = SimulationConfig::default();
        config.physics.delta_time = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.world.width = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWorld { .. })));
    }

    #[test]
    fn grid_dimensions_round_up() {
        let mut config = SimulationConfig::default();
        config.world.width = 110.0;
        config.world.height = 100.0;
        config.physics.radius_max = 25.0;
        let params = config.get_sim_params();
        assert_eq!(params.grid_dim_x, 5);
        assert_eq!(params.grid_dim_y, 4);
        assert_eq!(params.num_grid_cells, 20);
        assert_eq!(params.ideal_radius, 17.5);
    }
}
