//! Windowing provider over winit.
//!
//! The frame driver owns the loop, so events are pumped on demand instead of
//! handing control to `EventLoop::run_app`.

use std::time::Duration;

use anyhow::{bail, Context};
use inflight_core::Resolution;
use inflight_frame::Windowing;
use tracing::{debug, info};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

/// Pumps allowed while waiting for the platform to let us create the window.
const STARTUP_PUMPS: usize = 100;
const STARTUP_PUMP_TIMEOUT: Duration = Duration::from_millis(10);

/// Event handler state shared with winit during a pump.
struct WindowEvents {
    attributes: WindowAttributes,
    created: Option<Window>,
    create_error: Option<winit::error::OsError>,
    close_requested: bool,
}

impl ApplicationHandler for WindowEvents {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.created.is_some() || self.create_error.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.created = Some(window),
            Err(e) => self.create_error = Some(e),
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                self.close_requested = true;
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

/// A single winit window driven by [`Windowing::poll_events`].
pub struct WinitWindowing {
    window: Window,
    events: WindowEvents,
    event_loop: EventLoop<()>,
}

impl WinitWindowing {
    /// Create the event loop and open a window.
    pub fn new(title: &str, resolution: Resolution) -> anyhow::Result<Self> {
        let mut event_loop = EventLoop::new().context("Failed to create event loop")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut events = WindowEvents {
            attributes: Window::default_attributes()
                .with_title(title)
                .with_inner_size(PhysicalSize::new(resolution.width, resolution.height)),
            created: None,
            create_error: None,
            close_requested: false,
        };

        for _ in 0..STARTUP_PUMPS {
            let status = event_loop.pump_app_events(Some(STARTUP_PUMP_TIMEOUT), &mut events);
            if let Some(e) = events.create_error.take() {
                return Err(e).context("Failed to create window");
            }
            if let Some(window) = events.created.take() {
                let size = window.inner_size();
                info!("Window created: {}x{}", size.width, size.height);
                return Ok(Self {
                    window,
                    events,
                    event_loop,
                });
            }
            if let PumpStatus::Exit(code) = status {
                bail!("Event loop exited with code {code} before a window was created");
            }
        }

        bail!("Platform never resumed the application; no window was created")
    }

    /// The window the renderer presents to.
    pub fn window(&self) -> &Window {
        &self.window
    }
}

impl Windowing for WinitWindowing {
    fn poll_events(&mut self) {
        if let PumpStatus::Exit(code) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.events)
        {
            debug!("Event loop exited with code {code}");
            self.events.close_requested = true;
        }
    }

    fn drawable_resolution(&self) -> Resolution {
        if self.window.is_minimized() == Some(true) {
            return Resolution::default();
        }
        let size = self.window.inner_size();
        Resolution::new(size.width, size.height)
    }

    fn is_closing(&self) -> bool {
        self.events.close_requested
    }
}
