//! Application configuration.

use std::path::PathBuf;
use std::time::Duration;

use inflight_core::constants::{
    DEFAULT_RESOLUTION, DEFAULT_VSYNC, FRAMES_IN_FLIGHT, SLOT_WAIT_TIMEOUT, TEXTURE_WORKGROUP_SIZE,
};
use inflight_core::{PresentConfig, Resolution};
use inflight_frame::DriverConfig;

/// Default location of the static texture, inside the workspace checkout so
/// it resolves from any working directory.
pub const DEFAULT_TEXTURE_PATH: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../../assets/textures/test_tex_1.png"
);

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial window width.
    pub width: u32,
    /// Initial window height.
    pub height: u32,
    /// Enable vsync.
    pub vsync: bool,
    /// Number of frame slots. Fixed for the run.
    pub frames_in_flight: usize,
    /// Enable Vulkan validation layers (default: debug builds only).
    pub validation: bool,
    /// Image sampled by the composite pass.
    pub texture_path: PathBuf,
    /// How long to wait for a slot's previous submission before giving up.
    pub slot_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Inflight Frames".to_string(),
            width: DEFAULT_RESOLUTION.width,
            height: DEFAULT_RESOLUTION.height,
            vsync: DEFAULT_VSYNC,
            frames_in_flight: FRAMES_IN_FLIGHT,
            validation: cfg!(debug_assertions),
            texture_path: PathBuf::from(DEFAULT_TEXTURE_PATH),
            slot_timeout: SLOT_WAIT_TIMEOUT,
        }
    }
}

impl AppConfig {
    /// Create a new config with the given title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Set the window dimensions.
    #[must_use]
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Enable or disable vsync.
    #[must_use]
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    /// Set the number of frames in flight.
    #[must_use]
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn with_validation(mut self, validation: bool) -> Self {
        self.validation = validation;
        self
    }

    /// Set the static texture path.
    #[must_use]
    pub fn with_texture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.texture_path = path.into();
        self
    }

    /// Set the slot completion timeout.
    #[must_use]
    pub fn with_slot_timeout(mut self, timeout: Duration) -> Self {
        self.slot_timeout = timeout;
        self
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn present_config(&self) -> PresentConfig {
        PresentConfig::new(self.resolution(), self.vsync)
    }

    /// The subset of the configuration the frame driver uses.
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            frames_in_flight: self.frames_in_flight,
            present: self.present_config(),
            slot_timeout: self.slot_timeout,
            workgroup_size: TEXTURE_WORKGROUP_SIZE,
        }
    }
}
