//! Renderable terrain cells and their vertex generation

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::backend::{BufferHandle, RenderBackend};
use crate::frustum::Aabb;
use crate::heightmap::HeightBlock;

/// Grid position of an on-disk tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Terrain vertex as uploaded to the GPU
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
}

/// One live slot of the cell pool.
///
/// A cell is allocated once and repopulated in place whenever the streamer
/// assigns it a different tile. Its vertex buffer is created on first upload
/// and updated in place afterwards.
pub struct Cell {
    /// Tile currently held, if the slot was ever populated
    pub tile: Option<TileCoord>,
    /// `L×L` vertices, row-major
    pub vertices: Vec<Vertex>,
    pub aabb: Aabb,
    pub center: Vec3,
    pub vertex_buffer: Option<BufferHandle>,
    /// Detail level chosen by the last update
    pub lod: u8,
}

impl Cell {
    pub fn new(cell_length: u32) -> Self {
        let count = cell_length as usize * cell_length as usize;
        Self {
            tile: None,
            vertices: vec![Vertex::zeroed(); count],
            aabb: Aabb::EMPTY,
            center: Vec3::ZERO,
            vertex_buffer: None,
            lod: 0,
        }
    }

    /// Regenerate vertices, bounds and center from a padded height block.
    ///
    /// Only interior samples become vertices; the border feeds the central
    /// differences for normals, so edge vertices match their neighbors
    /// without reading other tiles.
    pub fn rebuild(&mut self, tile: TileCoord, block: &HeightBlock, y_scale: f32) {
        let length = block.cell_length() as usize;
        debug_assert_eq!(self.vertices.len(), length * length);

        let origin_x = tile.x as f32 * (length - 1) as f32;
        let origin_z = tile.y as f32 * (length - 1) as f32;

        let mut aabb = Aabb::EMPTY;
        for i in 0..length {
            for j in 0..length {
                // Padded coordinates of this vertex
                let (pi, pj) = (i + 1, j + 1);

                let position = Vec3::new(
                    origin_x + j as f32,
                    block.get(pi, pj) as f32 * y_scale,
                    origin_z + i as f32,
                );
                aabb.grow(position);

                let hl = block.get(pi, pj - 1) as f32;
                let hr = block.get(pi, pj + 1) as f32;
                let hu = block.get(pi - 1, pj) as f32;
                let hd = block.get(pi + 1, pj) as f32;

                // Unit horizontal run against the full neighbor rise
                let tangent_x = Vec3::new(1.0, (hr - hl) * y_scale, 0.0);
                let tangent_z = Vec3::new(0.0, (hd - hu) * y_scale, 1.0);
                let normal = tangent_z.cross(tangent_x).normalize();

                self.vertices[i * length + j] = Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    tangent: tangent_x.normalize().to_array(),
                };
            }
        }

        self.aabb = aabb;
        self.center = aabb.center();
        self.tile = Some(tile);
    }

    /// Push vertices to the GPU: create the buffer once, update it after.
    pub fn upload(&mut self, backend: &mut dyn RenderBackend) {
        let bytes: &[u8] = bytemuck::cast_slice(&self.vertices);
        match self.vertex_buffer {
            Some(handle) => backend.update_buffer(handle, bytes),
            None => {
                self.vertex_buffer = Some(backend.create_vertex_buffer("Terrain Cell Vertices", bytes));
            }
        }
    }

    /// True once the cell holds a tile with uploaded geometry
    pub fn is_drawable(&self) -> bool {
        self.tile.is_some() && self.vertex_buffer.is_some()
    }

    /// Release the vertex buffer, if any. Safe to call repeatedly.
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.vertex_buffer.take() {
            backend.destroy_buffer(handle);
        }
        self.tile = None;
    }
}
