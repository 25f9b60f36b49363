//! Renderer error types.

use inflight_frame::FrameError;
use inflight_gpu::GpuError;
use thiserror::Error;

/// Errors raised by the Vulkan frame backend.
#[derive(Error, Debug)]
pub enum RenderError {
    /// GPU error.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    /// Asset could not be loaded or decoded.
    #[error("Asset error: {0}")]
    Asset(String),

    /// Renderer construction parameters are unusable.
    #[error("Invalid renderer configuration: {0}")]
    InvalidConfig(String),

    /// A frame referenced a slot or image the renderer does not own.
    #[error("Unknown {kind} index {index}")]
    UnknownIndex { kind: &'static str, index: usize },
}

impl From<ash::vk::Result> for RenderError {
    fn from(e: ash::vk::Result) -> Self {
        Self::Gpu(GpuError::from(e))
    }
}

impl From<RenderError> for FrameError {
    fn from(e: RenderError) -> Self {
        Self::backend(e)
    }
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, RenderError>;
