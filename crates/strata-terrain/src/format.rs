//! Tile stream file format
//!
//! A tile stream is a fixed header followed by `tiles_x * tiles_y` records of
//! identical size, stored row-major. Identical record sizes make every tile
//! reachable with a single seek:
//!
//! ```text
//! [0]  i32 tiles_x
//! [4]  i32 tiles_y
//! [8]  u32 cell_length (L)
//! [12] records: i32 tile_x, i32 tile_y, u32 average_height, u16 heights[(L+2)^2]
//! ```
//!
//! All integers are little-endian. Header and preamble are written as their
//! in-memory `#[repr(C)]` images, so the codec is limited to little-endian
//! targets.

use std::io::{Read, Seek, SeekFrom, Write};

use bytemuck::{Pod, Zeroable};
use strata_core::{Result, StrataError};

use crate::heightmap::HeightBlock;

#[cfg(target_endian = "big")]
compile_error!("tile stream files are little-endian; big-endian targets are unsupported");

/// Byte size of the file header
pub const HEADER_SIZE: u64 = std::mem::size_of::<TileHeader>() as u64;

/// Byte size of a record's preamble (tile_x, tile_y, average_height)
pub const RECORD_PREAMBLE_SIZE: u64 = std::mem::size_of::<TilePreamble>() as u64;

/// Largest cell length a header may declare
const MAX_HEADER_CELL_LENGTH: u32 = u16::MAX as u32;

/// File header: grid dimensions plus the tile geometry they were written with.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TileHeader {
    pub tiles_x: i32,
    pub tiles_y: i32,
    pub cell_length: u32,
}

impl TileHeader {
    pub fn new(tiles_x: i32, tiles_y: i32, cell_length: u32) -> Self {
        Self {
            tiles_x,
            tiles_y,
            cell_length,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    /// Number of u16 samples in one record's height block
    pub fn height_block_len(&self) -> usize {
        let side = self.cell_length as usize + 2;
        side * side
    }

    pub fn height_block_bytes(&self) -> u64 {
        self.height_block_len() as u64 * 2
    }

    pub fn record_size(&self) -> u64 {
        RECORD_PREAMBLE_SIZE + self.height_block_bytes()
    }

    /// Byte offset of the record for tile (`x`, `y`).
    pub fn tile_offset(&self, x: i32, y: i32) -> u64 {
        let index = y as u64 * self.tiles_x as u64 + x as u64;
        HEADER_SIZE + index * self.record_size()
    }

    /// Total file size the header promises.
    pub fn file_size(&self) -> u64 {
        HEADER_SIZE + self.tile_count() as u64 * self.record_size()
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.tiles_x && y < self.tiles_y
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(bytemuck::bytes_of(self))?;
        Ok(())
    }

    /// Read and sanity-check a header from offset 0.
    pub fn read<R: Read + Seek>(input: &mut R) -> Result<Self> {
        input.seek(SeekFrom::Start(0))?;
        let mut header = Self::zeroed();
        input.read_exact(bytemuck::bytes_of_mut(&mut header))?;

        if header.tiles_x < 1 || header.tiles_y < 1 {
            return Err(StrataError::CorruptHeader(format!(
                "tile grid must be at least 1x1, got {}x{}",
                header.tiles_x, header.tiles_y
            )));
        }
        if !(2..=MAX_HEADER_CELL_LENGTH).contains(&header.cell_length) {
            return Err(StrataError::CorruptHeader(format!(
                "cell length {} is out of range",
                header.cell_length
            )));
        }

        Ok(header)
    }
}

/// The fixed-size leading fields of a tile record
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct TilePreamble {
    pub tile_x: i32,
    pub tile_y: i32,
    pub average_height: u32,
}

/// Append one record at the writer's current position.
pub fn write_tile<W: Write>(
    out: &mut W,
    x: i32,
    y: i32,
    average_height: u32,
    heights: &HeightBlock,
) -> Result<()> {
    let preamble = TilePreamble {
        tile_x: x,
        tile_y: y,
        average_height,
    };
    out.write_all(bytemuck::bytes_of(&preamble))?;
    out.write_all(bytemuck::cast_slice(heights.as_slice()))?;
    Ok(())
}

/// Position `stream` at the start of tile (`x`, `y`) and return the offset.
pub fn seek_tile<S: Seek>(stream: &mut S, header: &TileHeader, x: i32, y: i32) -> Result<u64> {
    let offset = header.tile_offset(x, y);
    stream.seek(SeekFrom::Start(offset))?;
    Ok(offset)
}

/// Read the preamble at the current position without validating it.
pub fn read_preamble<R: Read>(input: &mut R) -> Result<TilePreamble> {
    let mut preamble = TilePreamble::zeroed();
    input.read_exact(bytemuck::bytes_of_mut(&mut preamble))?;
    Ok(preamble)
}

/// Seek to tile (`x`, `y`), read its preamble and check the stored
/// coordinates. Returns the tile's average height; the stream is left at the
/// start of the height block.
pub fn read_tile_header<R: Read + Seek>(
    stream: &mut R,
    header: &TileHeader,
    x: i32,
    y: i32,
) -> Result<u32> {
    seek_tile(stream, header, x, y)?;
    let preamble = read_preamble(stream)?;
    if preamble.tile_x != x || preamble.tile_y != y {
        return Err(StrataError::TileMismatch {
            expected: (x, y),
            found: (preamble.tile_x, preamble.tile_y),
        });
    }
    Ok(preamble.average_height)
}

/// Read a height block at the current position into `block`.
pub fn read_tile_heights<R: Read>(input: &mut R, block: &mut HeightBlock) -> Result<()> {
    input.read_exact(bytemuck::cast_slice_mut(block.as_mut_slice()))?;
    Ok(())
}
