//! Inflight Frames Demo
//!
//! Generates an animated texture with a compute shader every frame and
//! composites it with a static texture onto the window.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p inflight-demo
//! ```
//!
//! The static texture `assets/textures/test_tex_1.png` is located through the
//! workspace checkout, so any working directory works.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

use inflight_app::{run, AppConfig, DEFAULT_TEXTURE_PATH};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

fn main() -> anyhow::Result<()> {
    if std::env::args().any(|arg| arg == "-h" || arg == "--help") {
        print_help();
        return Ok(());
    }

    run(AppConfig::new("Inflight Frames").with_size(WIDTH, HEIGHT))?;
    Ok(())
}

fn print_help() {
    eprintln!(
        "Inflight Frames Demo

USAGE:
    cargo run -p inflight-demo

Renders at {WIDTH}x{HEIGHT} with vsync off and two frames in flight.
The static texture is read from {}.

OPTIONS:
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log level (e.g., info, debug, trace)",
        DEFAULT_TEXTURE_PATH
    );
}
