//! Heightmap-to-tile-stream import command

use anyhow::{Context, Result};
use std::path::Path;

use super::load_settings;

pub fn run(heightmap: &str, output: &str, config: Option<&str>) -> Result<()> {
    let settings = load_settings(config)?;

    let summary = strata_terrain::import(Path::new(heightmap), Path::new(output), &settings)
        .with_context(|| format!("Failed to import {}", heightmap))?;

    println!("Imported {} -> {}", heightmap, output);
    println!(
        "  Tiles: {} x {} (cell length {})",
        summary.tiles_x, summary.tiles_y, summary.cell_length
    );
    println!("  Size:  {} bytes", summary.bytes_written);

    Ok(())
}
