//! wgpu implementation of the terrain render backend

use log::warn;
use strata_terrain::{BufferHandle, RenderBackend};
use wgpu::util::DeviceExt;

/// One queued terrain draw
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DrawCommand {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

/// Owns the GPU buffers the terrain leases and records its draws.
///
/// Buffers live in a slot arena addressed by `BufferHandle`; destroyed slots
/// are reused. Draws are queued during `Terrain::render` and replayed into a
/// render pass with `encode`.
pub struct WgpuBackend<'a> {
    device: &'a wgpu::Device,
    queue: &'a wgpu::Queue,
    buffers: Vec<Option<wgpu::Buffer>>,
    free: Vec<u32>,
    draws: Vec<DrawCommand>,
}

impl<'a> WgpuBackend<'a> {
    pub fn new(device: &'a wgpu::Device, queue: &'a wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: Vec::new(),
            free: Vec::new(),
            draws: Vec::new(),
        }
    }

    fn insert(&mut self, buffer: wgpu::Buffer) -> BufferHandle {
        match self.free.pop() {
            Some(slot) => {
                self.buffers[slot as usize] = Some(buffer);
                BufferHandle(slot)
            }
            None => {
                self.buffers.push(Some(buffer));
                BufferHandle(self.buffers.len() as u32 - 1)
            }
        }
    }

    fn get(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(handle.0 as usize).and_then(Option::as_ref)
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.iter().filter(|b| b.is_some()).count()
    }

    /// Forget the previous frame's draws.
    pub fn begin_frame(&mut self) {
        self.draws.clear();
    }

    pub fn draws(&self) -> &[DrawCommand] {
        &self.draws
    }

    /// Replay queued draws into `pass`. The terrain pipeline and its bind
    /// group must already be set.
    pub fn encode(&self, pass: &mut wgpu::RenderPass<'_>) {
        for draw in &self.draws {
            let (Some(vertices), Some(indices)) =
                (self.get(draw.vertex_buffer), self.get(draw.index_buffer))
            else {
                warn!("Skipping draw with released buffer {:?}", draw);
                continue;
            };
            pass.set_vertex_buffer(0, vertices.slice(..));
            pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
            pass.draw_indexed(0..draw.index_count, 0, 0..1);
        }
    }
}

impl RenderBackend for WgpuBackend<'_> {
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> BufferHandle {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        self.insert(buffer)
    }

    fn create_index_buffer(&mut self, label: &str, indices: &[u16]) -> BufferHandle {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        self.insert(buffer)
    }

    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]) {
        match self.get(handle) {
            Some(buffer) => self.queue.write_buffer(buffer, 0, data),
            None => warn!("Update of released buffer {:?}", handle),
        }
    }

    fn destroy_buffer(&mut self, handle: BufferHandle) {
        match self.buffers.get_mut(handle.0 as usize).and_then(Option::take) {
            Some(buffer) => {
                buffer.destroy();
                self.free.push(handle.0);
            }
            None => warn!("Buffer {:?} released twice", handle),
        }
    }

    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    ) {
        self.draws.push(DrawCommand {
            vertex_buffer,
            index_buffer,
            index_count,
        });
    }
}
