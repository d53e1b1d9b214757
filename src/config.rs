//! Configuration of a simulation run.

use crate::{
    control::ControlConfig, degradation::DegradationConfig, environment::EnvironmentConfig,
    game_loop::GameLoopConfig, production::ProductionConfig, structure::StructureConfig,
};
use anyhow::{Context, Result};
use rigsim_physics::PhysicsConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration parameters for every part of a simulation run. Every
/// section falls back to its defaults, so a configuration file only needs to
/// contain what differs from them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the random number generator driving storms, weather and
    /// maintenance.
    pub seed: u64,
    pub physics: PhysicsConfig,
    pub structure: StructureConfig,
    pub environment: EnvironmentConfig,
    pub production: ProductionConfig,
    pub degradation: DegradationConfig,
    pub controls: ControlConfig,
    pub game_loop: GameLoopConfig,
}

impl SimulationConfig {
    /// Parses the configuration from the RON file at the given path, resolves
    /// any specified paths and validates the result.
    ///
    /// # Errors
    /// Returns an error if the file can not be read or parsed, or if the
    /// configuration is invalid.
    pub fn from_ron_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref();
        let mut config: Self = rigsim_io::parse_ron_file(file_path)?;
        if let Some(root_path) = file_path.parent() {
            config.resolve_paths(root_path);
        }
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", file_path.display()))?;
        Ok(config)
    }

    /// Writes the configuration as a RON file to the given path.
    ///
    /// # Errors
    /// Returns an error if the file can not be written.
    pub fn write_ron_file(&self, file_path: impl AsRef<Path>) -> Result<()> {
        rigsim_io::write_ron_file(self, file_path)
    }

    /// Checks every section except the physics, which is checked when the
    /// physics world is created.
    ///
    /// # Errors
    /// Returns an error describing the first invalid parameter.
    pub fn validate(&self) -> Result<()> {
        self.structure.validate()?;
        self.environment.validate()?;
        self.production.validate()?;
        self.degradation.validate()?;
        self.controls.validate()?;
        self.game_loop.validate()?;
        Ok(())
    }

    /// Resolves all paths in the configuration by prepending the given root
    /// path to all paths.
    fn resolve_paths(&mut self, root_path: &Path) {
        if let Some(key_map_path) = &mut self.controls.key_map_path {
            *key_map_path = root_path.join(&*key_map_path);
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            physics: PhysicsConfig::default(),
            structure: StructureConfig::default(),
            environment: EnvironmentConfig::default(),
            production: ProductionConfig::default(),
            degradation: DegradationConfig::default(),
            controls: ControlConfig::default(),
            game_loop: GameLoopConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::JointConfig;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: SimulationConfig = ron::from_str(
            "(
                seed: 7,
                structure: (
                    n_columns: 4,
                    joint: Pin(rest_length: None),
                ),
            )",
        )
        .unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.structure.n_columns, 4);
        assert_eq!(config.structure.joint, JointConfig::Pin { rest_length: None });
        assert_eq!(config.structure.platform_width, 500.0);
        assert_eq!(config.environment, EnvironmentConfig::default());
        assert_eq!(config.physics.simulator.n_substeps, 40);
        config.validate().unwrap();
    }

    #[test]
    fn default_config_survives_serialization() {
        let text = ron::ser::to_string_pretty(
            &SimulationConfig::default(),
            ron::ser::PrettyConfig::default(),
        )
        .unwrap();
        let config: SimulationConfig = ron::from_str(&text).unwrap();
        assert_eq!(config.structure, StructureConfig::default());
        assert_eq!(config.production, ProductionConfig::default());
        assert_eq!(config.controls, ControlConfig::default());
    }

    #[test]
    fn invalid_section_fails_validation() {
        let mut config = SimulationConfig::default();
        config.production.layers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn key_map_path_is_resolved_relative_to_config() {
        let mut config = SimulationConfig::default();
        config.controls.key_map_path = Some("keys.ron".into());
        config.resolve_paths(Path::new("configs"));
        assert_eq!(
            config.controls.key_map_path.as_deref(),
            Some(Path::new("configs/keys.ron"))
        );
    }
}
