//! Configuration System
//!
//! Loads arena and behaviour tunables from a TOML file. Every section falls
//! back to the classic Combat Bees values, so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// Default tuning file path
pub const DEFAULT_CONFIG_PATH: &str = "combat_bees.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub field: FieldConfig,
    pub bees: BeeConfig,
    pub resources: ResourceConfig,
}

/// Run-level parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for every per-tick random stream
    pub seed: u64,
    /// Number of ticks the headless runner advances
    pub ticks: u64,
    /// Fixed timestep in seconds
    pub dt: f32,
    /// Worker threads in the compute pool (0 = one per core)
    pub workers: usize,
    /// Ticks between statistics samples
    pub stats_interval: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            ticks: 3600,
            dt: 1.0 / 60.0,
            workers: 0,
            stats_interval: 60,
        }
    }
}

/// Arena box and global physics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Full extents of the arena along x, y and z
    pub size: [f32; 3],
    /// Vertical acceleration applied to dead bees and falling resources
    pub gravity: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            size: [100.0, 20.0, 30.0],
            gravity: -20.0,
        }
    }
}

/// Bee behaviour tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeeConfig {
    pub initial_count: u32,
    pub min_size: f32,
    pub max_size: f32,
    pub max_spawn_speed: f32,
    pub speed_stretch: f32,
    pub rotation_stiffness: f32,
    pub flight_jitter: f32,
    pub damping: f32,
    pub team_attraction: f32,
    pub team_repulsion: f32,
    /// Probability that an idle bee picks a fight instead of a resource
    pub aggression: f32,
    pub chase_force: f32,
    pub carry_force: f32,
    pub attack_force: f32,
    pub grab_distance: f32,
    pub attack_distance: f32,
    pub hit_distance: f32,
    /// Seconds a dead bee lingers before removal
    pub death_duration: f32,
    /// Linear RGBA colour per team, handed to the renderer untouched
    pub team_colors: [[f32; 4]; 2],
}

impl Default for BeeConfig {
    fn default() -> Self {
        Self {
            initial_count: 1000,
            min_size: 0.25,
            max_size: 0.5,
            max_spawn_speed: 75.0,
            speed_stretch: 0.2,
            rotation_stiffness: 5.0,
            flight_jitter: 200.0,
            damping: 0.1,
            team_attraction: 5.0,
            team_repulsion: 4.0,
            aggression: 0.5,
            chase_force: 50.0,
            carry_force: 25.0,
            attack_force: 500.0,
            grab_distance: 0.5,
            attack_distance: 4.0,
            hit_distance: 0.5,
            death_duration: 10.0,
            team_colors: [[0.25, 0.45, 1.0, 1.0], [1.0, 0.85, 0.2, 1.0]],
        }
    }
}

/// Resource tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub initial_count: u32,
    pub size: f32,
    pub snap_stiffness: f32,
    pub carry_stiffness: f32,
    /// Bees hatched when a resource lands inside a hive
    pub bees_per_resource: u32,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            initial_count: 300,
            size: 0.75,
            snap_stiffness: 2.0,
            carry_stiffness: 15.0,
            bees_per_resource: 8,
        }
    }
}

impl SimConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Render this configuration as a TOML document
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from the default path, or use defaults if it is missing or broken
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_CONFIG_PATH).unwrap_or_else(|e| {
            tracing::warn!("Could not load {}: {}. Using defaults.", DEFAULT_CONFIG_PATH, e);
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.bees.initial_count, 1000);
        assert!(config.field.gravity < 0.0);
        assert!(config.bees.min_size <= config.bees.max_size);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            [bees]
            aggression = 0.9

            [field]
            size = [40.0, 10.0, 20.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.bees.aggression, 0.9);
        assert_eq!(config.bees.chase_force, BeeConfig::default().chase_force);
        assert_eq!(config.field.size, [40.0, 10.0, 20.0]);
        assert_eq!(config.resources, ResourceConfig::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = SimConfig::default();
        config.simulation.seed = 7;
        config.resources.bees_per_resource = 3;

        let text = config.to_toml().unwrap();
        let parsed = SimConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[simulation]\nticks = 12\nseed = 9").unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.simulation.ticks, 12);
        assert_eq!(config.simulation.seed, 9);
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = SimConfig::from_toml_str("[bees]\naggression = \"lots\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
