//! Renderer error type

use strata_core::StrataError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to get adapter")]
    AdapterNotFound,
    #[error("Failed to create device: {0}")]
    DeviceCreation(String),
    #[error("Failed to read render buffer: {0}")]
    BufferReadFailed(String),
    #[error("Invalid render target size {0}x{1}")]
    InvalidTargetSize(u32, u32),
}

impl From<RenderError> for StrataError {
    fn from(err: RenderError) -> Self {
        StrataError::RenderError(err.to_string())
    }
}
