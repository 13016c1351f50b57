//! Tile stream inspection command

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use strata_terrain::{TerrainStream, TileHeader};

use super::load_settings;

pub fn run(file: &str, config: Option<&str>, list_tiles: bool) -> Result<()> {
    let path = Path::new(file);
    let mut settings = load_settings(config)?;

    let header = {
        let mut reader = BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", file))?,
        );
        TileHeader::read(&mut reader).with_context(|| format!("Failed to read header of {}", file))?
    };

    // Inspect whatever geometry the file was written with
    if header.cell_length != settings.cell_length {
        println!(
            "Note: file cell length {} differs from configured {}",
            header.cell_length, settings.cell_length
        );
        settings.cell_length = header.cell_length;
    }
    settings.max_cells = 1;

    let stream = TerrainStream::open(path, &settings)
        .with_context(|| format!("Failed to open tile stream {}", file))?;

    let world = settings.tile_world_size();
    println!("Tile stream: {}", file);
    println!("  Tiles:        {} x {}", header.tiles_x, header.tiles_y);
    println!("  Cell length:  {}", header.cell_length);
    println!("  Record size:  {} bytes", header.record_size());
    println!("  File size:    {} bytes", header.file_size());
    println!(
        "  World extent: {} x {}",
        header.tiles_x as f32 * world,
        header.tiles_y as f32 * world
    );

    let averages = stream.meta().iter().map(|m| m.average_height);
    if let (Some(min), Some(max)) = (averages.clone().min(), averages.max()) {
        println!(
            "  Avg heights:  {} .. {} (world {:.2} .. {:.2})",
            min,
            max,
            min as f32 * settings.y_scale(),
            max as f32 * settings.y_scale()
        );
    }

    if list_tiles {
        println!();
        println!("  {:>5} {:>5} {:>8}", "x", "y", "avg");
        for meta in stream.meta() {
            println!("  {:>5} {:>5} {:>8}", meta.x, meta.y, meta.average_height);
        }
    }

    Ok(())
}
