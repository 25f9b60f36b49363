//! The frame driver.
//!
//! One iteration of [`FrameDriver::run_frame`]:
//! 1. Track the window's drawable size (zero area skips all GPU work).
//! 2. Acquire the current ring slot, waiting for its previous submission.
//! 3. Acquire a presentable image.
//! 4. Build the command plan, record it, write the slot's parameters and submit.
//! 5. Present.
//! 6. If nothing was presented and the swapchain is stale, rebuild it.
//! 7. Advance the ring.

use std::time::{Duration, Instant};

use inflight_core::constants::{
    DEFAULT_RESOLUTION, DEFAULT_VSYNC, FRAMES_IN_FLIGHT, SLOT_WAIT_TIMEOUT, TEXTURE_WORKGROUP_SIZE,
};
use inflight_core::{FrameClock, FrameParams, PresentConfig, Resolution};
use tracing::{debug, info, trace};

use crate::backend::{FrameBackend, Windowing};
use crate::error::{FrameError, FrameResult};
use crate::recorder::CommandRecorder;
use crate::ring::FrameRing;
use crate::swapchain::SwapchainLifecycle;
use crate::sync::SyncCoordinator;

/// Frame driver configuration.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub frames_in_flight: usize,
    pub present: PresentConfig,
    pub slot_timeout: Duration,
    pub workgroup_size: [u32; 2],
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            frames_in_flight: FRAMES_IN_FLIGHT,
            present: PresentConfig::new(DEFAULT_RESOLUTION, DEFAULT_VSYNC),
            slot_timeout: SLOT_WAIT_TIMEOUT,
            workgroup_size: TEXTURE_WORKGROUP_SIZE,
        }
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame_number: u64,
    /// Slot used, if the frame got that far.
    pub slot: Option<usize>,
    /// Parameters written, if work was submitted.
    pub params: Option<FrameParams>,
    pub submitted: bool,
    pub presented: bool,
    /// New swapchain resolution, if the swapchain was rebuilt.
    pub recreated: Option<Resolution>,
}

impl FrameReport {
    fn new(frame_number: u64) -> Self {
        Self {
            frame_number,
            slot: None,
            params: None,
            submitted: false,
            presented: false,
            recreated: None,
        }
    }
}

/// Counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frames: u64,
    pub submissions: u64,
    pub presentations: u64,
    /// Frames that submitted nothing.
    pub skipped: u64,
    pub recreations: u64,
}

impl FrameStats {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        if report.submitted {
            self.submissions += 1;
        } else {
            self.skipped += 1;
        }
        if report.presented {
            self.presentations += 1;
        }
        if report.recreated.is_some() {
            self.recreations += 1;
        }
    }
}

/// Owns the frame pipeline state and drives a backend once per frame.
#[derive(Debug)]
pub struct FrameDriver {
    ring: FrameRing,
    sync: SyncCoordinator,
    swapchain: SwapchainLifecycle,
    recorder: CommandRecorder,
    clock: FrameClock,
    stats: FrameStats,
}

impl FrameDriver {
    /// Create a driver for a swapchain that already exists at `initial`.
    pub fn new(config: DriverConfig, initial: Resolution) -> FrameResult<Self> {
        Self::with_clock(config, initial, FrameClock::start())
    }

    /// Create a driver with an explicit clock.
    pub fn with_clock(
        config: DriverConfig,
        initial: Resolution,
        clock: FrameClock,
    ) -> FrameResult<Self> {
        if initial.is_zero_area() {
            return Err(FrameError::InvalidConfig(
                "initial swapchain has zero area".to_string(),
            ));
        }
        let ring = FrameRing::new(config.frames_in_flight)?;
        let sync = SyncCoordinator::new(config.frames_in_flight, config.slot_timeout);
        Ok(Self {
            ring,
            sync,
            swapchain: SwapchainLifecycle::new(config.present, initial),
            recorder: CommandRecorder::new(config.workgroup_size),
            clock,
            stats: FrameStats::default(),
        })
    }

    pub fn ring(&self) -> &FrameRing {
        &self.ring
    }

    pub fn sync(&self) -> &SyncCoordinator {
        &self.sync
    }

    pub fn swapchain(&self) -> &SwapchainLifecycle {
        &self.swapchain
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Run one frame at time `now`.
    pub fn run_frame<B, W>(
        &mut self,
        backend: &mut B,
        window: &W,
        now: Instant,
    ) -> FrameResult<FrameReport>
    where
        B: FrameBackend + ?Sized,
        W: Windowing + ?Sized,
    {
        let frame_number = self.ring.frame_number();
        let _span = tracing::trace_span!("frame", frame = frame_number).entered();
        let mut report = FrameReport::new(frame_number);

        let window_size = window.drawable_resolution();
        let drawable = !window_size.is_zero_area();
        self.swapchain.set_desired_resolution(window_size);

        if !drawable {
            trace!("Window has zero area, skipping frame");
        } else if !self.swapchain.needs_recreation() {
            let slot = self.ring.acquire(&mut self.sync, backend)?;
            report.slot = Some(slot.index());

            if let Some(image) = self.swapchain.acquire_next(backend, &slot, window_size)? {
                let params =
                    FrameParams::new(self.swapchain.resolution(), self.clock.seconds_at(now));

                self.sync.begin_recording(backend, slot.index())?;
                let plan = self.recorder.record(&slot, &image, &params);
                let queued = backend
                    .record(&slot, &image, &plan)
                    .and_then(|()| backend.write_params(&slot, &params))
                    .and_then(|()| backend.submit(&slot, &image));
                if let Err(e) = queued {
                    self.sync.abort_recording(slot.index())?;
                    return Err(e);
                }
                self.sync.mark_submitted(slot.index(), slot.frame_number())?;

                report.params = Some(params);
                report.submitted = true;
                report.presented = self.swapchain.present(backend, &slot, &image)?;
            }
        }

        if !report.presented && drawable && self.swapchain.needs_recreation() {
            backend.wait_idle()?;
            report.recreated = Some(self.swapchain.recreate(backend)?);
        }

        self.stats.record(&report);
        self.ring.advance();
        Ok(report)
    }

    /// Run until the window asks to close, then shut down.
    ///
    /// Shutdown also runs when a frame fails; the frame error wins.
    pub fn run<B, W>(&mut self, backend: &mut B, window: &mut W) -> FrameResult<FrameStats>
    where
        B: FrameBackend + ?Sized,
        W: Windowing + ?Sized,
    {
        info!(
            slots = self.ring.slot_count(),
            resolution = %self.swapchain.resolution(),
            "Frame loop started"
        );

        let result = loop {
            window.poll_events();
            if window.is_closing() {
                break Ok(());
            }
            if let Err(e) = self.run_frame(backend, window, Instant::now()) {
                break Err(e);
            }
        };

        let shutdown = self.shutdown(backend);
        result?;
        shutdown?;
        Ok(self.stats)
    }

    /// Wait for every in-flight slot and for the device to go idle.
    pub fn shutdown<B>(&mut self, backend: &mut B) -> FrameResult<()>
    where
        B: FrameBackend + ?Sized,
    {
        debug!(in_flight = self.sync.in_flight(), "Shutting down frame loop");
        let waited = self.sync.wait_all(backend);
        backend.wait_idle()?;
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_constants() {
        let config = DriverConfig::default();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.present.resolution, Resolution::new(1280, 720));
        assert!(!config.present.vsync);
        assert_eq!(config.slot_timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_area_initial_swapchain_rejected() {
        assert!(matches!(
            FrameDriver::new(DriverConfig::default(), Resolution::new(0, 720)),
            Err(FrameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_slots_rejected() {
        let config = DriverConfig {
            frames_in_flight: 0,
            ..DriverConfig::default()
        };
        assert!(FrameDriver::new(config, Resolution::new(1280, 720)).is_err());
    }

    #[test]
    fn stats_count_skips() {
        let mut stats = FrameStats::default();
        let mut report = FrameReport::new(0);
        stats.record(&report);
        report.submitted = true;
        report.presented = true;
        stats.record(&report);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.submissions, 1);
        assert_eq!(stats.presentations, 1);
    }
}
