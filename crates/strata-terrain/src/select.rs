//! Per-frame visibility and LOD selection

use log::trace;

use crate::backend::{BufferHandle, RenderBackend};
use crate::cell::Cell;
use crate::frustum::Frustum;
use crate::lod::{LOD_LEVELS, MAX_LOD};

/// A shared LOD index buffer and its strip length
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexBuffer {
    pub handle: BufferHandle,
    pub count: u32,
}

/// Counters from one render pass over the cell pool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Pool slots examined
    pub considered: usize,
    /// Slots skipped because they hold no uploaded tile
    pub unpopulated: usize,
    /// Slots skipped by the frustum test
    pub culled: usize,
    pub drawn: usize,
    /// Strip triangles submitted, degenerates included
    pub triangles_submitted: u64,
}

/// The level a cell is drawn at: a valid override wins over the cell's own.
pub fn effective_lod(cell_lod: u8, override_level: Option<u8>) -> u8 {
    match override_level {
        Some(level) if level <= MAX_LOD => level,
        _ => cell_lod.min(MAX_LOD),
    }
}

/// Cull `cells` against `frustum` and issue one strip draw per survivor.
pub fn draw_cells(
    cells: &[Cell],
    frustum: &Frustum,
    index_buffers: &[IndexBuffer; LOD_LEVELS],
    override_level: Option<u8>,
    backend: &mut dyn RenderBackend,
) -> RenderStats {
    let mut stats = RenderStats::default();

    for cell in cells {
        stats.considered += 1;

        let Some(vertex_buffer) = cell.vertex_buffer.filter(|_| cell.is_drawable()) else {
            stats.unpopulated += 1;
            continue;
        };
        if !frustum.overlaps(&cell.aabb) {
            stats.culled += 1;
            continue;
        }

        let index = index_buffers[effective_lod(cell.lod, override_level) as usize];
        backend.draw_indexed(vertex_buffer, index.handle, index.count);
        stats.drawn += 1;
        stats.triangles_submitted += index.count.saturating_sub(2) as u64;
    }

    trace!(
        "Drew {} of {} cells ({} culled, {} empty)",
        stats.drawn,
        stats.considered,
        stats.culled,
        stats.unpopulated
    );
    stats
}
