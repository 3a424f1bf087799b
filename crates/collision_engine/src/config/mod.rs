//! Configuration system
//!
//! Collision settings are plain serde structs that can be loaded from and
//! saved to TOML or RON files. Validation happens once, when the engine is
//! built, so the per-tick operations never have to signal failure.

pub use serde::{Serialize, Deserialize};

use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its accepted range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Which broad-phase index the engine drives each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadPhaseKind {
    /// Uniform N×N cell grid (the live index during normal simulation)
    #[default]
    Grid,
    /// Dynamic bounding-volume hierarchy
    Bvh,
}

/// # Collision Configuration
///
/// World bounds, broad-phase selection and the tuning constants used by the
/// per-kind collision responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Side length of the square world; the world spans `[0, world_size)` on both axes
    pub world_size: f32,
    /// Number of grid cells along each axis
    pub grid_divisions: usize,
    /// Broad-phase index used by the engine
    pub broad_phase: BroadPhaseKind,
    /// Initial BVH node pool size (doubles when exhausted)
    pub bvh_initial_capacity: usize,
    /// Proximity radius at which trigger bodies (mines) detonate
    pub trigger_radius: f32,
    /// Spin added to terrain bodies per unit of penetration
    pub terrain_spin_factor: f32,
    /// Seed for the generator picking the terrain spin direction
    pub rng_seed: u64,
    /// Buffer collision events for the host to drain
    pub record_events: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            world_size: 1024.0,
            grid_divisions: 16,
            broad_phase: BroadPhaseKind::Grid,
            bvh_initial_capacity: 16,
            trigger_radius: 24.0,
            terrain_spin_factor: 0.05,
            rng_seed: 0x5eed,
            record_events: true,
        }
    }
}

impl Config for CollisionConfig {}

impl CollisionConfig {
    /// Select the broad-phase index
    pub fn with_broad_phase(mut self, kind: BroadPhaseKind) -> Self {
        self.broad_phase = kind;
        self
    }

    /// Set world size and grid resolution
    pub fn with_grid(mut self, world_size: f32, grid_divisions: usize) -> Self {
        self.world_size = world_size;
        self.grid_divisions = grid_divisions;
        self
    }

    /// Check every field is inside its accepted range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.world_size.is_finite() || self.world_size <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "world_size must be positive and finite, got {}",
                self.world_size
            )));
        }
        if self.grid_divisions == 0 {
            return Err(ConfigError::Invalid("grid_divisions must be at least 1".into()));
        }
        if self.bvh_initial_capacity == 0 {
            return Err(ConfigError::Invalid("bvh_initial_capacity must be at least 1".into()));
        }
        if self.trigger_radius.is_nan() || self.trigger_radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "trigger_radius must be non-negative, got {}",
                self.trigger_radius
            )));
        }
        if self.terrain_spin_factor.is_nan() || self.terrain_spin_factor < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "terrain_spin_factor must be non-negative, got {}",
                self.terrain_spin_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CollisionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_divisions() {
        let config = CollisionConfig::default().with_grid(100.0, 0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_bad_world_size() {
        for size in [0.0, -10.0, f32::NAN, f32::INFINITY] {
            let config = CollisionConfig::default().with_grid(size, 8);
            assert!(config.validate().is_err(), "world_size {size} accepted");
        }
    }

    #[test]
    fn test_rejects_nan_trigger_radius() {
        let config = CollisionConfig {
            trigger_radius: f32::NAN,
            ..CollisionConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: CollisionConfig = toml::from_str(
            "world_size = 500.0\nbroad_phase = \"bvh\"\n",
        )
        .unwrap();
        assert_eq!(config.world_size, 500.0);
        assert_eq!(config.broad_phase, BroadPhaseKind::Bvh);
        assert_eq!(config.grid_divisions, 16);
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("collision_config_{}.toml", std::process::id()));
        let config = CollisionConfig::default().with_grid(2048.0, 32);
        config.save_to_file(&path).unwrap();
        let loaded = CollisionConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_parses_broad_phase_kind() {
        let config: CollisionConfig =
            ron::from_str("(grid_divisions: 8, broad_phase: bvh, record_events: false)").unwrap();
        assert_eq!(config.grid_divisions, 8);
        assert_eq!(config.broad_phase, BroadPhaseKind::Bvh);
        assert!(!config.record_events);
    }

    #[test]
    fn test_unsupported_extension() {
        let result = CollisionConfig::load_from_file("settings.json");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
