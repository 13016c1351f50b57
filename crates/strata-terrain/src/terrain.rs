//! Terrain orchestration: index buffers, stream lifecycle, update and render

use std::path::Path;

use glam::Vec3;
use log::{debug, info, warn};
use strata_core::Result;

use crate::backend::RenderBackend;
use crate::config::TerrainSettings;
use crate::frustum::{CameraView, Frustum};
use crate::import::{import, ImportSummary};
use crate::lod::{generate_all_lods, LOD_LEVELS, MAX_LOD};
use crate::select::{draw_cells, IndexBuffer, RenderStats};
use crate::stream::TerrainStream;

/// A streamed, LOD-rendered heightmap terrain
///
/// `initialize` creates the eight shared LOD index buffers; `open_stream`
/// attaches a tile file. `update` and `render` do nothing while no stream is
/// open. All GPU resources are released through `shutdown`.
pub struct Terrain {
    settings: TerrainSettings,
    index_buffers: Option<[IndexBuffer; LOD_LEVELS]>,
    stream: Option<TerrainStream>,
    frustum: Option<Frustum>,
    camera_position: Option<Vec3>,
}

impl Terrain {
    pub fn new(settings: TerrainSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            index_buffers: None,
            stream: None,
            frustum: None,
            camera_position: None,
        })
    }

    pub fn settings(&self) -> &TerrainSettings {
        &self.settings
    }

    /// Create the shared LOD index buffers. Calling it again is a no-op.
    pub fn initialize(&mut self, backend: &mut dyn RenderBackend) {
        if self.index_buffers.is_some() {
            return;
        }
        let lods = generate_all_lods(self.settings.cell_length);
        self.index_buffers = Some(lods.map(|indices| IndexBuffer {
            handle: backend.create_index_buffer("Terrain LOD Indices", &indices),
            count: indices.len() as u32,
        }));
        debug!(
            "Created {} LOD index buffers for cell length {}",
            LOD_LEVELS, self.settings.cell_length
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.index_buffers.is_some()
    }

    /// Close any stream and release the index buffers. Idempotent.
    pub fn shutdown(&mut self, backend: &mut dyn RenderBackend) {
        self.close_stream(backend);
        if let Some(buffers) = self.index_buffers.take() {
            for buffer in buffers {
                backend.destroy_buffer(buffer.handle);
            }
            info!("Terrain shut down");
        }
    }

    /// Convert a heightmap image into a tile stream file using these settings.
    pub fn import(&self, source: &Path, dest: &Path) -> Result<ImportSummary> {
        import(source, dest, &self.settings)
    }

    /// Open a tile stream, closing any stream already open.
    pub fn open_stream(&mut self, path: &Path, backend: &mut dyn RenderBackend) -> Result<()> {
        self.close_stream(backend);
        self.stream = Some(TerrainStream::open(path, &self.settings)?);
        self.frustum = None;
        self.camera_position = None;
        Ok(())
    }

    /// Close the open stream, if any. Closing a closed stream does nothing.
    pub fn close_stream(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(stream) = self.stream.take() {
            stream.close(backend);
        }
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&TerrainStream> {
        self.stream.as_ref()
    }

    /// Load tile (`tile_x`, `tile_y`) into pool slot `slot`.
    ///
    /// # Panics
    ///
    /// Panics when no stream is open or the coordinates are out of range.
    pub fn read_cell(
        &mut self,
        tile_x: i32,
        tile_y: i32,
        slot: usize,
        backend: &mut dyn RenderBackend,
    ) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            panic!("read_cell on a closed terrain stream");
        };
        stream.read_cell(tile_x, tile_y, slot, backend)
    }

    /// Stream tiles toward the camera and refresh per-cell LOD. Returns the
    /// number of tiles read. With `update_camera` off the last captured
    /// position is reused.
    pub fn update(&mut self, camera: &CameraView, backend: &mut dyn RenderBackend) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(0);
        };

        let position = match self.camera_position {
            Some(position) if !self.settings.update_camera => position,
            _ => camera.position(),
        };
        self.camera_position = Some(position);

        stream.refresh(position, &self.settings, backend)
    }

    /// Draw every visible loaded cell. With `update_frustum` off the last
    /// frustum is reused.
    pub fn render(&mut self, camera: &CameraView, backend: &mut dyn RenderBackend) -> RenderStats {
        let Some(stream) = self.stream.as_ref() else {
            return RenderStats::default();
        };
        let Some(index_buffers) = self.index_buffers.as_ref() else {
            warn!("Terrain render before initialize; nothing drawn");
            return RenderStats::default();
        };

        let frustum = match self.frustum {
            Some(frustum) if !self.settings.update_frustum => frustum,
            _ => camera.frustum(),
        };
        self.frustum = Some(frustum);

        draw_cells(
            stream.cells(),
            &frustum,
            index_buffers,
            self.settings.lod.override_level,
            backend,
        )
    }

    /// Force every cell to `level`, or return to distance LOD with `None`.
    ///
    /// # Panics
    ///
    /// Panics if `level` is above 7.
    pub fn set_lod_override(&mut self, level: Option<u8>) {
        if let Some(level) = level {
            assert!(level <= MAX_LOD, "LOD override {} out of range", level);
        }
        self.settings.lod.override_level = level;
    }

    pub fn set_update_frustum(&mut self, enabled: bool) {
        self.settings.update_frustum = enabled;
    }

    pub fn set_update_camera(&mut self, enabled: bool) {
        self.settings.update_camera = enabled;
    }
}

impl Drop for Terrain {
    fn drop(&mut self) {
        if self.stream.is_some() || self.index_buffers.is_some() {
            warn!("Terrain dropped without shutdown; GPU buffers were not released");
        }
    }
}
