//! The render backend seam
//!
//! Terrain never touches GPU objects directly. It leases buffers from a
//! backend by handle, updates them in place, and issues indexed strip draws.
//! The terrain is the sole owner of every handle it creates and releases each
//! one exactly once.

/// Opaque handle to a backend-owned buffer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// GPU resource creation and draw submission consumed by the terrain
pub trait RenderBackend {
    /// Create a vertex buffer initialized with `data`. The buffer must accept
    /// later same-sized updates.
    fn create_vertex_buffer(&mut self, label: &str, data: &[u8]) -> BufferHandle;

    /// Create an immutable 16-bit index buffer.
    fn create_index_buffer(&mut self, label: &str, indices: &[u16]) -> BufferHandle;

    /// Overwrite a vertex buffer's contents in place.
    fn update_buffer(&mut self, handle: BufferHandle, data: &[u8]);

    /// Release a buffer. Handles are never released twice.
    fn destroy_buffer(&mut self, handle: BufferHandle);

    /// Draw `index_count` strip indices from `index_buffer` over `vertex_buffer`.
    fn draw_indexed(
        &mut self,
        vertex_buffer: BufferHandle,
        index_buffer: BufferHandle,
        index_count: u32,
    );
}
