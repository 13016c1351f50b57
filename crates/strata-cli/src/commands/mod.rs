//! CLI command implementations

pub mod import;
pub mod info;
pub mod render;

use anyhow::{Context, Result};
use std::path::Path;
use strata_terrain::TerrainSettings;

/// Settings from `--config`, or the defaults.
pub fn load_settings(config: Option<&str>) -> Result<TerrainSettings> {
    match config {
        Some(path) => TerrainSettings::load(Path::new(path))
            .with_context(|| format!("Failed to load terrain settings from {}", path)),
        None => Ok(TerrainSettings::default()),
    }
}
