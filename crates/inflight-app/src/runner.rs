//! Startup, frame loop and teardown.

use anyhow::{bail, Context};
use inflight_core::constants::TEXTURE_WORKGROUP_SIZE;
use inflight_frame::{FrameDriver, FrameStats};
use inflight_gpu::GpuContextBuilder;
use inflight_render::{load_texture, Renderer, RendererConfig};
use raw_window_handle::HasDisplayHandle;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::window::WinitWindowing;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` filter. Later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();
}

/// Open a window, render until it is closed, then tear everything down.
///
/// Returns the frame statistics of the run. GPU resources are released
/// after the device is idle on every exit path.
pub fn run(config: AppConfig) -> anyhow::Result<FrameStats> {
    init_logging();
    info!("{} starting...", config.title);

    let texture = load_texture(&config.texture_path)
        .with_context(|| format!("Failed to load {}", config.texture_path.display()))?;
    info!(
        "Loaded {} ({}x{})",
        config.texture_path.display(),
        texture.width(),
        texture.height()
    );

    let mut windowing = WinitWindowing::new(&config.title, config.resolution())?;
    let display = windowing
        .window()
        .display_handle()
        .context("Window has no display handle")?
        .as_raw();

    let gpu = GpuContextBuilder::new()
        .app_name(&config.title)
        .validation(config.validation)
        .display(display)
        .build()
        .context("Failed to create GPU context")?;

    if !gpu.capabilities().supports_workgroup(TEXTURE_WORKGROUP_SIZE) {
        bail!(
            "GPU does not support {}x{} compute workgroups",
            TEXTURE_WORKGROUP_SIZE[0],
            TEXTURE_WORKGROUP_SIZE[1]
        );
    }

    let renderer_config = RendererConfig {
        present: config.present_config(),
        frames_in_flight: config.frames_in_flight,
    };
    let mut renderer = Renderer::new(gpu, windowing.window(), renderer_config, &texture)
        .context("Failed to create renderer")?;

    // The swapchain may not match the requested size; its extent is the
    // render resolution from here on
    let mut driver = FrameDriver::new(config.driver_config(), renderer.resolution())?;
    let result = driver.run(&mut renderer, &mut windowing);

    // Surface goes before the window
    drop(renderer);
    drop(windowing);

    match result {
        Ok(stats) => {
            info!("Frame statistics:");
            info!("  Frames: {}", stats.frames);
            info!("  Submitted: {}", stats.submissions);
            info!("  Presented: {}", stats.presentations);
            info!("  Skipped: {}", stats.skipped);
            info!("  Swapchain recreations: {}", stats.recreations);
            info!("Shutdown complete");
            Ok(stats)
        }
        Err(e) => {
            error!("Frame loop failed: {e}");
            Err(e.into())
        }
    }
}
