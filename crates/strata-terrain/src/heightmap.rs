//! Heightmap loading and padded per-tile height blocks

use std::path::Path;

use image::{ColorType, ImageError};
use log::warn;
use strata_core::{Result, StrataError};

/// A full-resolution 16-bit heightmap raster, row-major.
pub struct Heightmap {
    samples: Vec<u16>,
    /// Width in pixels
    pub width: u32,
    /// Height (depth) in pixels
    pub height: u32,
}

impl Heightmap {
    /// Load a 16-bit heightmap image.
    ///
    /// Single-channel L16 data is used as-is. Other 16-bit layouts are reduced
    /// to luma. Anything that is not 16 bits per channel is rejected with
    /// `InvalidInput`, since 8-bit sources would silently lose precision.
    pub fn from_image(path: &Path) -> Result<Self> {
        let img = image::open(path).map_err(|e| match e {
            ImageError::IoError(io) => StrataError::IoError(io),
            other => StrataError::ImageLoad(format!(
                "failed to decode heightmap '{}': {}",
                path.display(),
                other
            )),
        })?;

        match img.color() {
            ColorType::L16 => {}
            ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 => {
                warn!(
                    "heightmap '{}' is {:?}; reducing to a single luma channel",
                    path.display(),
                    img.color()
                );
            }
            other => {
                return Err(StrataError::InvalidInput(format!(
                    "heightmap '{}' must be 16-bit, got {:?}",
                    path.display(),
                    other
                )))
            }
        }

        let luma = img.into_luma16();
        let (width, height) = luma.dimensions();
        Self::from_raw(luma.into_raw(), width, height)
    }

    /// Wrap raw row-major samples.
    pub fn from_raw(samples: Vec<u16>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(StrataError::InvalidInput(format!(
                "heightmap must not be empty ({}x{})",
                width, height
            )));
        }
        if samples.len() != width as usize * height as usize {
            return Err(StrataError::InvalidInput(format!(
                "heightmap has {} samples, expected {}x{}",
                samples.len(),
                width,
                height
            )));
        }
        Ok(Self {
            samples,
            width,
            height,
        })
    }

    pub fn get(&self, x: u32, y: u32) -> u16 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Sample with edge clamping; coordinates outside the raster read the
    /// nearest valid pixel.
    pub fn get_clamped(&self, x: i64, y: i64) -> u16 {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.get(x, y)
    }

    /// Copy the padded window whose interior starts at (`origin_x`, `origin_y`)
    /// into `block`. The window begins one sample before the origin on each
    /// axis so the block carries a one-sample border all round.
    pub fn sample_block(&self, origin_x: i64, origin_y: i64, block: &mut HeightBlock) {
        let side = block.side();
        for row in 0..side {
            for col in 0..side {
                let h = self.get_clamped(origin_x - 1 + col as i64, origin_y - 1 + row as i64);
                block.set(row, col, h);
            }
        }
    }
}

/// One tile's height samples: an `L×L` interior plus a one-sample border on
/// every side, stored row-major as `(L+2)×(L+2)` values.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightBlock {
    samples: Vec<u16>,
    cell_length: u32,
}

impl HeightBlock {
    pub fn new(cell_length: u32) -> Self {
        let side = cell_length as usize + 2;
        Self {
            samples: vec![0; side * side],
            cell_length,
        }
    }

    /// Interior edge length `L`
    pub fn cell_length(&self) -> u32 {
        self.cell_length
    }

    /// Padded edge length `L + 2`
    pub fn side(&self) -> usize {
        self.cell_length as usize + 2
    }

    /// Read at padded coordinates; (0, 0) is the top-left border sample.
    pub fn get(&self, row: usize, col: usize) -> u16 {
        self.samples[row * self.side() + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: u16) {
        let side = self.side();
        self.samples[row * side + col] = value;
    }

    /// Read at interior coordinates; (0, 0) is the first emitted vertex.
    pub fn interior(&self, row: usize, col: usize) -> u16 {
        self.get(row + 1, col + 1)
    }

    /// Integer mean over every sample, border included.
    pub fn average(&self) -> u32 {
        let sum: u64 = self.samples.iter().map(|&h| h as u64).sum();
        (sum / self.samples.len() as u64) as u32
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.samples
    }
}
