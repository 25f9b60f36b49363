//! Core types and constants for the inflight frames renderer.
//!
//! This crate provides the foundational types shared by every other crate:
//! - Resolution and presentation configuration
//! - The per-frame uniform parameter block
//! - Decoded texture data handed over by the asset loader
//! - A monotonic frame clock
//! - Common error types

pub mod clock;
pub mod error;
pub mod params;
pub mod types;

pub use clock::FrameClock;
pub use error::{Error, Result};
pub use params::FrameParams;
pub use types::{PresentConfig, Resolution, TextureData};

/// Renderer-wide constants.
pub mod constants {
    use std::time::Duration;

    use crate::types::Resolution;

    /// Number of frames that may be queued to the GPU at once.
    pub const FRAMES_IN_FLIGHT: usize = 2;
    /// Startup render resolution.
    pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(1280, 720);
    /// Startup vsync setting.
    pub const DEFAULT_VSYNC: bool = false;
    /// Upper bound on how long the CPU blocks waiting for a frame slot.
    pub const SLOT_WAIT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Work-group size of the procedural texture compute shader (x, y).
    ///
    /// Must match `local_size_x`/`local_size_y` in `texture.comp`.
    pub const TEXTURE_WORKGROUP_SIZE: [u32; 2] = [16, 16];
}
