//! Offline conversion of a heightmap image into a tile stream file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, info};
use strata_core::{Result, StrataError};

use crate::config::TerrainSettings;
use crate::format::{write_tile, TileHeader};
use crate::heightmap::{HeightBlock, Heightmap};

/// What an import produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportSummary {
    pub tiles_x: i32,
    pub tiles_y: i32,
    pub cell_length: u32,
    pub bytes_written: u64,
}

/// Tile grid dimensions for a raster: tiles step by `L-1` samples so
/// neighbors share their boundary row and column.
pub fn tile_grid(width: u32, height: u32, cell_length: u32) -> (i32, i32) {
    let stride = cell_length - 1;
    let tiles_x = width.div_ceil(stride).max(1);
    let tiles_y = height.div_ceil(stride).max(1);
    (tiles_x as i32, tiles_y as i32)
}

/// Load `source` and write its tile stream to `dest`.
pub fn import(source: &Path, dest: &Path, settings: &TerrainSettings) -> Result<ImportSummary> {
    settings.validate()?;
    let heightmap = Heightmap::from_image(source)?;
    info!(
        "Importing heightmap '{}' ({}x{})",
        source.display(),
        heightmap.width,
        heightmap.height
    );

    let summary = write_replacing(dest, |out| {
        import_heightmap(&heightmap, out, settings.cell_length)
    })?;

    info!(
        "Wrote {}x{} tiles ({} bytes) to '{}'",
        summary.tiles_x,
        summary.tiles_y,
        summary.bytes_written,
        dest.display()
    );
    Ok(summary)
}

/// Write `dest` through a sibling `.partial` file that is renamed into place
/// only once `write` succeeds. On failure the partial file is removed and any
/// existing `dest` is left untouched.
fn write_replacing<T>(
    dest: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<T>,
) -> Result<T> {
    let mut partial_name = dest.file_name().unwrap_or_default().to_os_string();
    partial_name.push(".partial");
    let partial = dest.with_file_name(partial_name);

    let result = File::create(&partial).map_err(StrataError::from).and_then(|file| {
        let mut out = BufWriter::new(file);
        let value = write(&mut out)?;
        out.into_inner().map_err(|e| e.into_error())?.sync_all()?;
        Ok(value)
    });

    match result {
        Ok(value) => {
            std::fs::rename(&partial, dest)?;
            Ok(value)
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                debug!("Could not remove '{}': {}", partial.display(), cleanup);
            }
            Err(e)
        }
    }
}

/// Write the tile stream for an in-memory heightmap.
///
/// Records are emitted row-major, each holding the edge-clamped
/// `(L+2)×(L+2)` window around the tile's interior.
pub fn import_heightmap<W: Write>(
    heightmap: &Heightmap,
    out: &mut W,
    cell_length: u32,
) -> Result<ImportSummary> {
    if cell_length < 2 {
        return Err(StrataError::InvalidInput(format!(
            "cell length {} is too small",
            cell_length
        )));
    }

    let (tiles_x, tiles_y) = tile_grid(heightmap.width, heightmap.height, cell_length);
    let header = TileHeader::new(tiles_x, tiles_y, cell_length);
    header.write(out)?;

    let stride = (cell_length - 1) as i64;
    let mut block = HeightBlock::new(cell_length);
    for y in 0..tiles_y {
        for x in 0..tiles_x {
            heightmap.sample_block(x as i64 * stride, y as i64 * stride, &mut block);
            let average = block.average();
            write_tile(out, x, y, average, &block)?;
            debug!("Wrote tile ({}, {}) avg {}", x, y, average);
        }
    }

    Ok(ImportSummary {
        tiles_x,
        tiles_y,
        cell_length,
        bytes_written: header.file_size(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{read_tile_header, read_tile_heights};
    use std::io::Cursor;

    fn noise(width: u32, height: u32) -> Heightmap {
        let samples = (0..width * height)
            .map(|i| (i.wrapping_mul(2_654_435_761) >> 16) as u16)
            .collect();
        Heightmap::from_raw(samples, width, height).unwrap()
    }

    #[test]
    fn grid_uses_shared_edge_stride() {
        assert_eq!(tile_grid(258, 258, 129), (3, 3));
        assert_eq!(tile_grid(256, 128, 129), (2, 1));
        assert_eq!(tile_grid(1, 1, 129), (1, 1));
        assert_eq!(tile_grid(9, 5, 5), (3, 2));
    }

    #[test]
    fn bytes_written_matches_output() {
        let hm = noise(13, 9);
        let mut out = Vec::new();
        let summary = import_heightmap(&hm, &mut out, 5).unwrap();
        assert_eq!((summary.tiles_x, summary.tiles_y), (4, 3));
        assert_eq!(summary.bytes_written, out.len() as u64);
    }

    #[test]
    fn interior_samples_pass_through_losslessly() {
        let hm = noise(17, 11);
        let mut out = Vec::new();
        let summary = import_heightmap(&hm, &mut out, 5).unwrap();

        let mut cursor = Cursor::new(out);
        let header = TileHeader::read(&mut cursor).unwrap();
        let mut block = HeightBlock::new(5);
        for ty in 0..summary.tiles_y {
            for tx in 0..summary.tiles_x {
                read_tile_header(&mut cursor, &header, tx, ty).unwrap();
                read_tile_heights(&mut cursor, &mut block).unwrap();
                for row in 0..5u32 {
                    for col in 0..5u32 {
                        let px = tx as u32 * 4 + col;
                        let py = ty as u32 * 4 + row;
                        if px < hm.width && py < hm.height {
                            assert_eq!(
                                block.interior(row as usize, col as usize),
                                hm.get(px, py),
                                "tile ({}, {}) sample ({}, {})",
                                tx,
                                ty,
                                row,
                                col
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn neighbors_share_their_boundary_column() {
        let hm = noise(9, 5);
        let mut out = Vec::new();
        import_heightmap(&hm, &mut out, 5).unwrap();

        let mut cursor = Cursor::new(out);
        let header = TileHeader::read(&mut cursor).unwrap();
        let mut left = HeightBlock::new(5);
        let mut right = HeightBlock::new(5);
        read_tile_header(&mut cursor, &header, 0, 0).unwrap();
        read_tile_heights(&mut cursor, &mut left).unwrap();
        read_tile_header(&mut cursor, &header, 1, 0).unwrap();
        read_tile_heights(&mut cursor, &mut right).unwrap();

        for row in 0..5 {
            assert_eq!(left.interior(row, 4), right.interior(row, 0));
        }
    }

    #[test]
    fn import_from_png_writes_file() {
        let dir = std::env::temp_dir().join(format!("strata_import_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("hm.png");
        let dst = dir.join("hm.terrain");

        let img = image::ImageBuffer::from_fn(10, 6, |x, y| image::Luma([(x * 1000 + y) as u16]));
        img.save(&src).unwrap();

        let mut settings = TerrainSettings::default();
        settings.cell_length = 5;
        let summary = import(&src, &dst, &settings).unwrap();

        assert_eq!((summary.tiles_x, summary.tiles_y), (3, 2));
        let len = std::fs::metadata(&dst).unwrap().len();
        assert_eq!(len, summary.bytes_written);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_write_leaves_no_output() {
        let dir = std::env::temp_dir().join(format!("strata_import_fail_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let dst = dir.join("broken.terrain");
        std::fs::write(&dst, b"previous").unwrap();

        let result: Result<()> = write_replacing(&dst, |out| {
            out.write_all(&[0; 64])?;
            Err(StrataError::InvalidInput("interrupted".to_string()))
        });

        assert!(matches!(result, Err(StrataError::InvalidInput(_))));
        assert_eq!(std::fs::read(&dst).unwrap(), b"previous");
        assert!(!dir.join("broken.terrain.partial").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn successful_import_leaves_no_partial_file() {
        let dir = std::env::temp_dir().join(format!("strata_import_ok_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let src = dir.join("hm.png");
        let dst = dir.join("hm.terrain");
        image::ImageBuffer::from_fn(4, 4, |x, y| image::Luma([(x + y) as u16]))
            .save(&src)
            .unwrap();

        let mut settings = TerrainSettings::default();
        settings.cell_length = 3;
        import(&src, &dst, &settings).unwrap();

        assert!(dst.exists());
        assert!(!dir.join("hm.terrain.partial").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
