//! Terrain streaming configuration, loadable from TOML

use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_core::{Result, StrataError};

use crate::lod::LOD_LEVELS;

/// Largest accepted pool edge; the pool holds `max_cells²` full-size cells
pub const MAX_POOL_EDGE: u32 = 32;

/// Distance-to-LOD curve parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Exponent applied to camera distance
    pub exponent: f32,
    /// Divisor applied after the exponent
    pub divisor: f32,
    /// Force every cell to this level (0..=7)
    pub override_level: Option<u8>,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            exponent: 1.3,
            divisor: 5000.0,
            override_level: None,
        }
    }
}

/// Configuration for terrain streaming and rendering
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainSettings {
    /// Tile edge length in samples (128 interior + 1 shared edge by default)
    pub cell_length: u32,
    /// World-space Y extent covered by the full u16 range
    pub height_range: f32,
    /// Edge length of the live cell pool (pool holds `max_cells²` slots)
    pub max_cells: u32,
    /// Maximum tiles read from disk per update
    pub max_loads_per_update: usize,
    /// Recompute the culling frustum every render; disable to freeze culling
    pub update_frustum: bool,
    /// Recapture the camera position every update; disable to freeze streaming
    pub update_camera: bool,
    pub lod: LodSettings,
}

impl Default for TerrainSettings {
    fn default() -> Self {
        Self {
            cell_length: 129,
            height_range: 1000.0,
            max_cells: 9,
            max_loads_per_update: 4,
            update_frustum: true,
            update_camera: true,
            lod: LodSettings::default(),
        }
    }
}

impl TerrainSettings {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: Self = toml::from_str(source)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of slots in the live cell pool
    pub fn pool_size(&self) -> usize {
        self.max_cells as usize * self.max_cells as usize
    }

    /// World units per height sample step: `height_range / 65535`
    pub fn y_scale(&self) -> f32 {
        self.height_range / u16::MAX as f32
    }

    /// World units spanned by one tile (tiles share their edge sample)
    pub fn tile_world_size(&self) -> f32 {
        (self.cell_length - 1) as f32
    }

    pub fn validate(&self) -> Result<()> {
        let quads = self.cell_length.saturating_sub(1);
        if !(2..=128).contains(&quads) || !quads.is_power_of_two() {
            return Err(StrataError::ConfigError(format!(
                "cell_length must be 2^n + 1 between 3 and 129, got {}",
                self.cell_length
            )));
        }
        if !(1..=MAX_POOL_EDGE).contains(&self.max_cells) {
            return Err(StrataError::ConfigError(format!(
                "max_cells must be between 1 and {}, got {}",
                MAX_POOL_EDGE, self.max_cells
            )));
        }
        if self.max_loads_per_update == 0 {
            return Err(StrataError::ConfigError(
                "max_loads_per_update must be at least 1".to_string(),
            ));
        }
        if !(self.height_range.is_finite() && self.height_range > 0.0) {
            return Err(StrataError::ConfigError(format!(
                "height_range must be positive, got {}",
                self.height_range
            )));
        }
        if !(self.lod.divisor > 0.0 && self.lod.exponent > 0.0) {
            return Err(StrataError::ConfigError(
                "lod exponent and divisor must be positive".to_string(),
            ));
        }
        if let Some(level) = self.lod.override_level {
            if level as usize >= LOD_LEVELS {
                return Err(StrataError::ConfigError(format!(
                    "lod override {} is outside 0..{}",
                    level, LOD_LEVELS
                )));
            }
        }
        Ok(())
    }
}
