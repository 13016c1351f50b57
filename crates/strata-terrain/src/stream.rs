//! Open tile streams: the tile index table, the cell pool and the streamer
//! that keeps the pool filled around the camera

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use glam::Vec3;
use log::{debug, info, trace};
use strata_core::{Result, StrataError};

use crate::backend::RenderBackend;
use crate::cell::{Cell, TileCoord};
use crate::config::TerrainSettings;
use crate::format::{read_tile_header, read_tile_heights, TileHeader};
use crate::heightmap::HeightBlock;
use crate::lod::lod_for_distance;

/// Per-tile bookkeeping built when the stream opens
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetaCell {
    pub x: u32,
    pub y: u32,
    pub average_height: u32,
    /// True while some pool slot holds this tile
    pub is_loaded: bool,
}

/// An open tile stream file together with the live cell pool it feeds
pub struct TerrainStream {
    reader: BufReader<File>,
    path: PathBuf,
    header: TileHeader,
    meta: Vec<MetaCell>,
    cells: Vec<Cell>,
    slots: HashMap<TileCoord, usize>,
    block: HeightBlock,
    y_scale: f32,
}

impl TerrainStream {
    /// Open `path`, validate its header against `settings` and scan every
    /// record's preamble into the tile index table.
    ///
    /// The pool is allocated with `max_cells²` empty slots; no GPU resources
    /// exist until a tile is read into a slot.
    pub fn open(path: &Path, settings: &TerrainSettings) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let header = TileHeader::read(&mut reader)?;
        if header.cell_length != settings.cell_length {
            return Err(StrataError::FormatMismatch {
                expected: settings.cell_length,
                found: header.cell_length,
            });
        }
        if file_len < header.file_size() {
            return Err(StrataError::CorruptHeader(format!(
                "header promises {}x{} tiles ({} bytes) but file is {} bytes",
                header.tiles_x,
                header.tiles_y,
                header.file_size(),
                file_len
            )));
        }

        let mut meta = Vec::with_capacity(header.tile_count());
        for y in 0..header.tiles_y {
            for x in 0..header.tiles_x {
                let average_height = read_tile_header(&mut reader, &header, x, y)?;
                meta.push(MetaCell {
                    x: x as u32,
                    y: y as u32,
                    average_height,
                    is_loaded: false,
                });
            }
        }

        let pool_size = settings.pool_size();
        let cells = (0..pool_size)
            .map(|_| Cell::new(header.cell_length))
            .collect();

        info!(
            "Opened terrain stream '{}': {}x{} tiles, cell length {}, {} slots",
            path.display(),
            header.tiles_x,
            header.tiles_y,
            header.cell_length,
            pool_size
        );

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            header,
            meta,
            cells,
            slots: HashMap::new(),
            block: HeightBlock::new(header.cell_length),
            y_scale: settings.y_scale(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &TileHeader {
        &self.header
    }

    /// The tile index table, row-major by `y * tiles_x + x`
    pub fn meta(&self) -> &[MetaCell] {
        &self.meta
    }

    pub fn meta_cell(&self, x: i32, y: i32) -> Option<&MetaCell> {
        if !self.header.contains(x, y) {
            return None;
        }
        self.meta.get(self.meta_index(TileCoord::new(x, y)))
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Slot currently holding `tile`, if loaded
    pub fn slot_of(&self, tile: TileCoord) -> Option<usize> {
        self.slots.get(&tile).copied()
    }

    pub fn loaded_count(&self) -> usize {
        self.slots.len()
    }

    fn meta_index(&self, tile: TileCoord) -> usize {
        tile.y as usize * self.header.tiles_x as usize + tile.x as usize
    }

    /// Load tile (`tile_x`, `tile_y`) from disk into pool slot `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the tile lies outside the grid or the slot outside the pool.
    /// Callers only request tiles the index table knows about.
    pub fn read_cell(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        slot: usize,
        backend: &mut dyn RenderBackend,
    ) -> Result<()> {
        assert!(
            self.header.contains(tile_x, tile_y),
            "tile ({}, {}) outside {}x{} grid",
            tile_x,
            tile_y,
            self.header.tiles_x,
            self.header.tiles_y
        );
        assert!(
            slot < self.cells.len(),
            "slot {} outside pool of {}",
            slot,
            self.cells.len()
        );

        let tile = TileCoord::new(tile_x, tile_y);
        read_tile_header(&mut self.reader, &self.header, tile_x, tile_y)?;
        read_tile_heights(&mut self.reader, &mut self.block)?;

        // Forget whatever the slot held before
        if let Some(previous) = self.cells[slot].tile {
            if self.slots.get(&previous) == Some(&slot) {
                self.slots.remove(&previous);
                let index = self.meta_index(previous);
                self.meta[index].is_loaded = false;
            }
        }
        // A tile lives in one slot at a time
        if let Some(other) = self.slots.insert(tile, slot) {
            if other != slot {
                self.cells[other].tile = None;
            }
        }

        let cell = &mut self.cells[slot];
        cell.rebuild(tile, &self.block, self.y_scale);
        cell.upload(backend);

        let index = self.meta_index(tile);
        self.meta[index].is_loaded = true;
        trace!("Read tile ({}, {}) into slot {}", tile_x, tile_y, slot);
        Ok(())
    }

    /// Bring the pool closer to the window of tiles around `camera`, then
    /// assign each loaded cell its distance LOD. Returns the number of tiles
    /// read from disk.
    ///
    /// The wanted window is `min(max_cells, tiles)` tiles per axis centered on
    /// the camera's tile and clamped into the grid. Missing tiles are admitted
    /// nearest first into empty slots, then into slots holding tiles outside
    /// the window (farthest first), at most `max_loads_per_update` per call.
    pub fn refresh(
        &mut self,
        camera: Vec3,
        settings: &TerrainSettings,
        backend: &mut dyn RenderBackend,
    ) -> Result<usize> {
        let window = self.window_around(camera, settings.max_cells);
        let distance = |tile: &TileCoord| self.tile_distance_sq(*tile, camera);

        let mut missing: Vec<TileCoord> = window
            .tiles()
            .filter(|tile| !self.slots.contains_key(tile))
            .collect();
        missing.sort_by(|a, b| distance(a).total_cmp(&distance(b)).then(a.cmp(b)));

        let mut free: Vec<usize> = Vec::new();
        let mut evictable: Vec<(usize, TileCoord)> = Vec::new();
        for (slot, cell) in self.cells.iter().enumerate() {
            match cell.tile {
                None => free.push(slot),
                Some(tile) if !window.contains(tile) => evictable.push((slot, tile)),
                Some(_) => {}
            }
        }
        evictable.sort_by(|(_, a), (_, b)| distance(b).total_cmp(&distance(a)).then(a.cmp(b)));

        let mut candidates = free
            .into_iter()
            .map(|slot| (slot, None))
            .chain(evictable.into_iter().map(|(slot, tile)| (slot, Some(tile))));

        let mut loads = 0;
        for tile in missing.into_iter().take(settings.max_loads_per_update) {
            let Some((slot, evicted)) = candidates.next() else {
                break;
            };
            if let Some(old) = evicted {
                debug!(
                    "Evicting tile ({}, {}) from slot {} for ({}, {})",
                    old.x, old.y, slot, tile.x, tile.y
                );
            } else {
                debug!("Admitting tile ({}, {}) into slot {}", tile.x, tile.y, slot);
            }
            self.read_cell(tile.x, tile.y, slot, backend)?;
            loads += 1;
        }

        for cell in self.cells.iter_mut().filter(|c| c.tile.is_some()) {
            cell.lod = lod_for_distance(cell.center.distance(camera), &settings.lod);
        }

        Ok(loads)
    }

    fn window_around(&self, camera: Vec3, max_cells: u32) -> TileWindow {
        let stride = (self.header.cell_length - 1) as f32;
        let width = (max_cells as i32).min(self.header.tiles_x);
        let height = (max_cells as i32).min(self.header.tiles_y);

        let center_x = ((camera.x / stride).floor() as i32).clamp(0, self.header.tiles_x - 1);
        let center_y = ((camera.z / stride).floor() as i32).clamp(0, self.header.tiles_y - 1);

        TileWindow {
            x: (center_x - width / 2).clamp(0, self.header.tiles_x - width),
            y: (center_y - height / 2).clamp(0, self.header.tiles_y - height),
            width,
            height,
        }
    }

    /// Squared ground-plane distance from the camera to a tile's center
    fn tile_distance_sq(&self, tile: TileCoord, camera: Vec3) -> f32 {
        let stride = (self.header.cell_length - 1) as f32;
        let dx = (tile.x as f32 + 0.5) * stride - camera.x;
        let dz = (tile.y as f32 + 0.5) * stride - camera.z;
        dx * dx + dz * dz
    }

    /// Release every cell's GPU buffer and close the file.
    pub fn close(mut self, backend: &mut dyn RenderBackend) {
        for cell in &mut self.cells {
            cell.release(backend);
        }
        info!("Closed terrain stream '{}'", self.path.display());
    }
}

/// Rectangle of tile coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct TileWindow {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

impl TileWindow {
    fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.x
            && tile.y >= self.y
            && tile.x < self.x + self.width
            && tile.y < self.y + self.height
    }

    fn tiles(&self) -> impl Iterator<Item = TileCoord> {
        let window = *self;
        (window.y..window.y + window.height)
            .flat_map(move |y| (window.x..window.x + window.width).map(move |x| TileCoord::new(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingBackend;
    use crate::format::write_tile;
    use crate::heightmap::Heightmap;
    use crate::import::import_heightmap;
    use std::io::Write;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let dir = std::env::temp_dir().join(format!("strata_{}_{}", name, std::process::id()));
            std::fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn small_settings(max_cells: u32) -> TerrainSettings {
        TerrainSettings {
            cell_length: 5,
            max_cells,
            max_loads_per_update: 64,
            ..Default::default()
        }
    }

    /// A `tiles × tiles` stream with cell length 5 and heights equal to
    /// the pixel row
    fn write_stream(dir: &TempDir, tiles: u32) -> PathBuf {
        let side = tiles * 4;
        let samples = (0..side).flat_map(|y| (0..side).map(move |_| y as u16)).collect();
        let hm = Heightmap::from_raw(samples, side, side).unwrap();
        let path = dir.0.join("stream.terrain");
        let mut file = File::create(&path).unwrap();
        import_heightmap(&hm, &mut file, 5).unwrap();
        path
    }

    #[test]
    fn open_builds_index_table() {
        let dir = TempDir::new("stream_open");
        let path = write_stream(&dir, 3);
        let stream = TerrainStream::open(&path, &small_settings(2)).unwrap();

        assert_eq!(stream.meta().len(), 9);
        assert_eq!(stream.cells().len(), 4);
        assert!(stream.meta().iter().all(|m| !m.is_loaded));
        assert!(stream.cells().iter().all(|c| c.vertex_buffer.is_none()));
        let meta = stream.meta_cell(2, 1).unwrap();
        assert_eq!((meta.x, meta.y), (2, 1));
        assert!(stream.meta_cell(3, 0).is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new("stream_missing");
        let result = TerrainStream::open(&dir.0.join("nope.terrain"), &small_settings(2));
        assert!(matches!(result, Err(StrataError::IoError(_))));
    }

    #[test]
    fn cell_length_mismatch_is_rejected() {
        let dir = TempDir::new("stream_mismatch");
        let path = write_stream(&dir, 2);
        let result = TerrainStream::open(&path, &TerrainSettings::default());
        assert!(matches!(
            result,
            Err(StrataError::FormatMismatch {
                expected: 129,
                found: 5
            })
        ));
    }

    #[test]
    fn truncated_file_is_corrupt() {
        let dir = TempDir::new("stream_truncated");
        let path = write_stream(&dir, 2);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 1]).unwrap();

        let result = TerrainStream::open(&path, &small_settings(2));
        assert!(matches!(result, Err(StrataError::CorruptHeader(_))));
    }

    #[test]
    fn misplaced_record_fails_open() {
        let dir = TempDir::new("stream_misplaced");
        let path = dir.0.join("bad.terrain");
        let mut file = File::create(&path).unwrap();
        TileHeader::new(2, 1, 5).write(&mut file).unwrap();
        let block = HeightBlock::new(5);
        write_tile(&mut file, 0, 0, 0, &block).unwrap();
        write_tile(&mut file, 0, 0, 0, &block).unwrap();
        file.flush().unwrap();

        let result = TerrainStream::open(&path, &small_settings(2));
        assert!(matches!(result, Err(StrataError::TileMismatch { .. })));
    }

    #[test]
    fn read_cell_reuses_slot_buffer() {
        let dir = TempDir::new("stream_reuse");
        let path = write_stream(&dir, 3);
        let mut stream = TerrainStream::open(&path, &small_settings(1)).unwrap();
        let mut backend = RecordingBackend::default();

        stream.read_cell(0, 0, 0, &mut backend).unwrap();
        stream.read_cell(2, 1, 0, &mut backend).unwrap();

        assert_eq!(backend.vertex_creates, 1);
        assert_eq!(backend.updates, 1);
        assert!(!stream.meta_cell(0, 0).unwrap().is_loaded);
        assert!(stream.meta_cell(2, 1).unwrap().is_loaded);
        assert_eq!(stream.slot_of(TileCoord::new(2, 1)), Some(0));
        assert_eq!(stream.slot_of(TileCoord::new(0, 0)), None);
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn read_cell_past_last_row_panics() {
        let dir = TempDir::new("stream_row_panic");
        let path = write_stream(&dir, 2);
        let mut stream = TerrainStream::open(&path, &small_settings(1)).unwrap();
        let mut backend = RecordingBackend::default();
        let _ = stream.read_cell(0, 2, 0, &mut backend);
    }

    #[test]
    fn refresh_fills_window_around_camera() {
        let dir = TempDir::new("stream_refresh");
        let path = write_stream(&dir, 4);
        let settings = small_settings(2);
        let mut stream = TerrainStream::open(&path, &settings).unwrap();
        let mut backend = RecordingBackend::default();

        // Camera over tile (0, 0): window is tiles 0..2 on both axes
        let loads = stream
            .refresh(Vec3::new(1.0, 50.0, 1.0), &settings, &mut backend)
            .unwrap();
        assert_eq!(loads, 4);
        for (x, y) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            assert!(stream.slot_of(TileCoord::new(x, y)).is_some());
        }

        // Nothing to do while the camera stays put
        let loads = stream
            .refresh(Vec3::new(1.0, 50.0, 1.0), &settings, &mut backend)
            .unwrap();
        assert_eq!(loads, 0);

        // Move to the far corner: every slot is recycled in place
        let loads = stream
            .refresh(Vec3::new(15.0, 50.0, 15.0), &settings, &mut backend)
            .unwrap();
        assert_eq!(loads, 4);
        for (x, y) in [(2, 2), (3, 2), (2, 3), (3, 3)] {
            assert!(stream.slot_of(TileCoord::new(x, y)).is_some());
        }
        assert_eq!(stream.loaded_count(), 4);
        assert_eq!(stream.meta().iter().filter(|m| m.is_loaded).count(), 4);
        assert_eq!(backend.vertex_creates, 4);
        assert_eq!(backend.updates, 4);
    }

    #[test]
    fn refresh_respects_load_budget() {
        let dir = TempDir::new("stream_budget");
        let path = write_stream(&dir, 3);
        let mut settings = small_settings(3);
        settings.max_loads_per_update = 2;
        let mut stream = TerrainStream::open(&path, &settings).unwrap();
        let mut backend = RecordingBackend::default();

        let camera = Vec3::new(6.0, 10.0, 6.0);
        assert_eq!(stream.refresh(camera, &settings, &mut backend).unwrap(), 2);
        // Nearest first: the center tile goes in before anything else
        assert!(stream.slot_of(TileCoord::new(1, 1)).is_some());
        assert_eq!(stream.refresh(camera, &settings, &mut backend).unwrap(), 2);
        assert_eq!(stream.loaded_count(), 4);
    }

    #[test]
    fn refresh_assigns_distance_lod() {
        let dir = TempDir::new("stream_lod");
        let path = write_stream(&dir, 2);
        let mut settings = small_settings(2);
        settings.lod.divisor = 1.0;
        settings.lod.exponent = 1.0;
        let mut stream = TerrainStream::open(&path, &settings).unwrap();
        let mut backend = RecordingBackend::default();

        stream
            .refresh(Vec3::new(2.0, 0.0, 2.0), &settings, &mut backend)
            .unwrap();
        let near = stream.slot_of(TileCoord::new(0, 0)).unwrap();
        let far = stream.slot_of(TileCoord::new(1, 1)).unwrap();
        assert!(stream.cells()[near].lod < stream.cells()[far].lod);
    }

    #[test]
    fn close_releases_each_buffer_once() {
        let dir = TempDir::new("stream_close");
        let path = write_stream(&dir, 2);
        let settings = small_settings(2);
        let mut stream = TerrainStream::open(&path, &settings).unwrap();
        let mut backend = RecordingBackend::default();
        stream.refresh(Vec3::ZERO, &settings, &mut backend).unwrap();

        stream.close(&mut backend);
        assert_eq!(backend.destroys, 4);
        assert!(backend.live.is_empty());
    }
}
