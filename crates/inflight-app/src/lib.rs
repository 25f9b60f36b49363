//! Application layer for the inflight frames renderer.
//!
//! Owns the window, builds the GPU context and renderer, and hands control
//! to the frame driver until the window is closed.
//!
//! # Example
//!
//! ```no_run
//! use inflight_app::{run, AppConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     run(AppConfig::default())?;
//!     Ok(())
//! }
//! ```

mod config;
mod runner;
mod window;

pub use config::{AppConfig, DEFAULT_TEXTURE_PATH};
pub use runner::{init_logging, run};
pub use window::WinitWindowing;

pub use inflight_frame::FrameStats;
