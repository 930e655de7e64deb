//! # Engine Configuration
//!
//! Serde-backed configuration for the chunk manager. Every field has a default, so
//! an empty JSON object (or no file at all) yields a working engine.
//!
//! ```
//! use voxel_streamer::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "worker_count": 2, "target_radius": 3 }"#).unwrap();
//! assert_eq!(config.worker_count, 2);
//! assert_eq!(config.generator.name, "terrain");
//! ```

use std::path::{Path, PathBuf};

use cgmath::Point3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of mesh workers when none is configured.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Capacity of the consumer-side mesh cache when none is configured.
pub const DEFAULT_MESH_CACHE_CAPACITY: usize = 10000;

/// Inclusive bounds of the world in chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Smallest chunk coordinate on each axis
    pub min: [i32; 3],
    /// Largest chunk coordinate on each axis
    pub max: [i32; 3],
}

impl WorldBounds {
    /// Bounds that accept every representable chunk coordinate.
    pub const UNBOUNDED: WorldBounds = WorldBounds {
        min: [i32::MIN; 3],
        max: [i32::MAX; 3],
    };

    /// Returns `true` if the chunk coordinate lies inside the bounds.
    pub fn contains(&self, position: Point3<i32>) -> bool {
        let coords = [position.x, position.y, position.z];
        (0..3).all(|axis| coords[axis] >= self.min[axis] && coords[axis] <= self.max[axis])
    }

    /// Returns `true` if no axis is limited.
    pub fn is_unbounded(&self) -> bool {
        *self == Self::UNBOUNDED
    }
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

/// Generator selection and tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Registry name of the generator (`terrain`, `perlin`, `checkerboard`, `solid`, `empty`)
    pub name: String,
    /// Seed shared by every noise source
    pub seed: u32,
    /// Surface height at zero noise, in blocks
    pub base_height: i32,
    /// Amplitude of the heightmap, in blocks
    pub height_scale: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            name: String::from("terrain"),
            seed: 0,
            base_height: 8,
            height_scale: 24.0,
        }
    }
}

/// Complete configuration of a streaming world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of mesh worker threads
    pub worker_count: usize,
    /// Horizontal load radius the streamer grows towards, in chunks
    pub target_radius: i32,
    /// Vertical load radius cap, in chunks
    pub vertical_radius: i32,
    /// Load radius of the first round; a round at radius `r` covers every chunk
    /// within `r` of the viewer chunk on each horizontal axis
    pub initial_radius: i32,
    /// Radius growth per round
    pub radius_step: i32,
    /// World generator selection
    pub generator: GeneratorConfig,
    /// Optional finite world bounds
    pub world_bounds: Option<WorldBounds>,
    /// Directory of persisted chunks
    pub save_directory: Option<PathBuf>,
    /// Abort preloading a stored world on the first failed chunk
    pub complete_or_nothing: bool,
    /// Maximum number of chunk meshes kept by the consumer cache
    pub mesh_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            target_radius: 4,
            vertical_radius: 2,
            initial_radius: 1,
            radius_step: 1,
            generator: GeneratorConfig::default(),
            world_bounds: None,
            save_directory: None,
            complete_or_nothing: false,
            mesh_cache_capacity: DEFAULT_MESH_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// The configured bounds, or unbounded.
    pub fn bounds(&self) -> WorldBounds {
        self.world_bounds.unwrap_or_default()
    }

    /// Rejects values the streamer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_count == 0 {
            return Err(ConfigError::Invalid(String::from(
                "worker_count must be at least 1",
            )));
        }
        if self.target_radius < 0 || self.vertical_radius < 0 || self.initial_radius < 0 {
            return Err(ConfigError::Invalid(String::from(
                "load radii must not be negative",
            )));
        }
        if self.radius_step < 1 {
            return Err(ConfigError::Invalid(String::from(
                "radius_step must be at least 1",
            )));
        }
        if self.mesh_cache_capacity == 0 {
            return Err(ConfigError::Invalid(String::from(
                "mesh_cache_capacity must be at least 1",
            )));
        }
        if let Some(bounds) = &self.world_bounds {
            if (0..3).any(|axis| bounds.min[axis] > bounds.max[axis]) {
                return Err(ConfigError::Invalid(format!(
                    "world bounds min {:?} exceeds max {:?}",
                    bounds.min, bounds.max
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.bounds().is_unbounded());
    }

    #[test]
    fn partial_generator_section_keeps_other_defaults() {
        let config =
            EngineConfig::from_json_str(r#"{ "generator": { "name": "perlin", "seed": 9 } }"#)
                .unwrap();
        assert_eq!(config.generator.name, "perlin");
        assert_eq!(config.generator.seed, 9);
        assert_eq!(config.generator.base_height, GeneratorConfig::default().base_height);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "worker_count": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = EngineConfig::from_json_str(
            r#"{ "world_bounds": { "min": [0, 5, 0], "max": [1, 1, 1] } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = EngineConfig::from_json_str("{ worker_count: }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn bounds_contain_is_inclusive() {
        let bounds = WorldBounds {
            min: [-1, 0, -1],
            max: [1, 2, 1],
        };
        assert!(bounds.contains(Point3::new(1, 2, -1)));
        assert!(!bounds.contains(Point3::new(2, 0, 0)));
        assert!(!bounds.contains(Point3::new(0, -1, 0)));
    }
}
