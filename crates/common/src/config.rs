use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest neighborhood half-width a streamer accepts.
pub const MAX_LOAD_RADIUS: u32 = 32;

/// Streaming configuration: tile geometry, neighborhood size and pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// World units along one tile edge.
    pub tile_size: f32,
    /// Edge length of the authored grid (the table holds `grid_dimension²` entries).
    pub grid_dimension: u32,
    /// Half-width (in tiles) of the square neighborhood kept resident.
    pub load_radius: u32,
    /// Delay between successive load/unload operations in one pass.
    pub pacing_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tile_size: 500.0,
            grid_dimension: 10,
            load_radius: 1,
            pacing_interval_ms: 100,
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("tile_size must be positive and finite, got {0}")]
    InvalidTileSize(f32),
    #[error("grid_dimension must be at least 1")]
    EmptyGrid,
    #[error("load_radius {radius} exceeds the maximum of {max}")]
    RadiusTooLarge { radius: u32, max: u32 },
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(ConfigError::InvalidTileSize(self.tile_size));
        }
        if self.grid_dimension == 0 {
            return Err(ConfigError::EmptyGrid);
        }
        if self.load_radius > MAX_LOAD_RADIUS {
            return Err(ConfigError::RadiusTooLarge {
                radius: self.load_radius,
                max: MAX_LOAD_RADIUS,
            });
        }
        Ok(())
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_millis(self.pacing_interval_ms)
    }

    /// Number of entries a fully authored table holds.
    pub fn authored_len(&self) -> usize {
        let n = self.grid_dimension as usize;
        n * n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_generator_layout() {
        let config = StreamConfig::default();
        assert_eq!(config.tile_size, 500.0);
        assert_eq!(config.grid_dimension, 10);
        assert_eq!(config.load_radius, 1);
        assert_eq!(config.pacing_interval(), Duration::from_millis(100));
        assert_eq!(config.authored_len(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_tile_size() {
        for tile_size in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            let config = StreamConfig {
                tile_size,
                ..StreamConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidTileSize(_))
            ));
        }
    }

    #[test]
    fn rejects_empty_grid_and_huge_radius() {
        let config = StreamConfig {
            grid_dimension: 0,
            ..StreamConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyGrid));

        let config = StreamConfig {
            load_radius: MAX_LOAD_RADIUS + 1,
            ..StreamConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::RadiusTooLarge {
                radius: MAX_LOAD_RADIUS + 1,
                max: MAX_LOAD_RADIUS
            })
        );
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config: StreamConfig =
            serde_yaml::from_str("tile_size: 250.0\npacing_interval_ms: 0\n").unwrap();
        assert_eq!(config.tile_size, 250.0);
        assert_eq!(config.pacing_interval_ms, 0);
        assert_eq!(config.grid_dimension, 10);
        assert_eq!(config.load_radius, 1);
    }
}
