//! Strata Render - wgpu backend for streamed terrain
//!
//! Implements the terrain's `RenderBackend` on wgpu buffers, provides the
//! triangle-strip terrain pipeline, an orbit camera and a headless context
//! for rendering frames to images.

mod backend;
mod camera;
mod error;
mod headless;
mod pipeline;

pub use backend::{DrawCommand, WgpuBackend};
pub use camera::OrbitCamera;
pub use error::RenderError;
pub use headless::HeadlessContext;
pub use pipeline::{vertex_layout, TerrainDrawData, TerrainPipeline, TerrainUniforms};
