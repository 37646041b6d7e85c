//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::tile::TileGrid;
use crate::{CanvasError, CanvasResult};

/// Tunables of the tiled canvas.
///
/// Every field has a default, so a JSON file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Edge length of a tile interior in world pixels.
    pub tile_size: u32,
    /// Extra buffer pixels per tile edge (even, split across both sides).
    pub tile_padding: u32,
    /// Tile budget at normal zoom; scaled by the zoom tier.
    pub base_tile_capacity: usize,
    /// Tile creations between two lazy eviction passes.
    pub cleanup_interval: u32,
    /// Lowest zoom factor.
    pub min_zoom: f32,
    /// Highest zoom factor.
    pub max_zoom: f32,
    /// Tiles per side of a load batch (a batch is `load_batch²` tiles).
    pub load_batch: u32,
    /// Grab radius of annotation handles in screen pixels.
    pub handle_radius_px: f32,
    /// Evicted tile buffers kept for reuse.
    pub spare_pool: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            tile_size: 256,
            tile_padding: 2,
            base_tile_capacity: 500,
            cleanup_interval: 25,
            min_zoom: 0.05,
            max_zoom: 10.0,
            load_batch: 10,
            handle_radius_px: 10.0,
            spare_pool: 32,
        }
    }
}

impl CanvasConfig {
    /// Largest accepted tile edge.
    pub const MAX_TILE_SIZE: u32 = 4096;

    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        tracing::debug!(
            "Canvas config: {}px tiles, capacity {}, zoom {}..{}",
            config.tile_size,
            config.base_tile_capacity,
            config.min_zoom,
            config.max_zoom
        );
        Ok(config)
    }

    /// Check every value for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`CanvasError::InvalidConfig`] naming the first offending field.
    pub fn validate(&self) -> CanvasResult<()> {
        let fail = |msg: String| Err(CanvasError::InvalidConfig(msg));

        if self.tile_size == 0 || self.tile_size > Self::MAX_TILE_SIZE {
            return fail(format!(
                "tile_size must be in 1..={}, got {}",
                Self::MAX_TILE_SIZE,
                self.tile_size
            ));
        }
        if self.tile_padding % 2 != 0 || self.tile_padding >= self.tile_size {
            return fail(format!(
                "tile_padding must be even and smaller than tile_size, got {}",
                self.tile_padding
            ));
        }
        if self.base_tile_capacity == 0 {
            return fail("base_tile_capacity must be positive".to_string());
        }
        if self.cleanup_interval == 0 {
            return fail("cleanup_interval must be positive".to_string());
        }
        if self.load_batch == 0 {
            return fail("load_batch must be positive".to_string());
        }
        if !(self.min_zoom.is_finite() && self.max_zoom.is_finite())
            || self.min_zoom <= 0.0
            || self.min_zoom > self.max_zoom
        {
            return fail(format!(
                "zoom bounds must satisfy 0 < min_zoom <= max_zoom, got {}..{}",
                self.min_zoom, self.max_zoom
            ));
        }
        if !self.handle_radius_px.is_finite() || self.handle_radius_px <= 0.0 {
            return fail("handle_radius_px must be positive".to_string());
        }
        Ok(())
    }

    /// Tile geometry described by this configuration.
    #[must_use]
    pub fn grid(&self) -> TileGrid {
        TileGrid::new(self.tile_size, self.tile_padding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = CanvasConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid().buffer_edge(), 258);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CanvasConfig::from_json(r#"{"tile_size": 128, "base_tile_capacity": 4}"#)
            .expect("valid config");
        assert_eq!(config.tile_size, 128);
        assert_eq!(config.base_tile_capacity, 4);
        assert_eq!(config.cleanup_interval, 25);
    }

    #[test]
    fn test_rejects_bad_values() {
        let cases = [
            r#"{"tile_size": 0}"#,
            r#"{"tile_padding": 3}"#,
            r#"{"base_tile_capacity": 0}"#,
            r#"{"cleanup_interval": 0}"#,
            r#"{"min_zoom": 2.0, "max_zoom": 1.0}"#,
            r#"{"min_zoom": 0.0}"#,
            r#"{"load_batch": 0}"#,
        ];
        for json in cases {
            let err = CanvasConfig::from_json(json).expect_err(json);
            assert!(matches!(err, CanvasError::InvalidConfig(_)), "{json}: {err}");
        }
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            CanvasConfig::from_json("{tile_size"),
            Err(CanvasError::Serialization(_))
        ));
    }
}
