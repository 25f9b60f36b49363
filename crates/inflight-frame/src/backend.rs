//! Traits implemented by the graphics backend and the windowing provider.
//!
//! The frame pipeline never talks to a graphics API directly. It drives a
//! backend through these seams, which keeps the ring, the synchronization
//! state machine and the frame driver testable without a GPU.

use std::time::Duration;

use inflight_core::{FrameParams, PresentConfig, Resolution};

use crate::error::FrameResult;
use crate::recorder::FramePlan;
use crate::ring::AcquiredSlot;
use crate::swapchain::SwapchainImage;

/// Outcome of waiting on a slot's completion signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    /// The GPU finished the work last submitted from the slot.
    Signaled,
    /// The wait budget elapsed first.
    TimedOut,
}

/// Per-slot GPU completion signals (fences).
pub trait CompletionSignals {
    /// Block until the slot's last submission completes or `timeout` elapses.
    fn wait(&mut self, slot: usize, timeout: Duration) -> FrameResult<SignalStatus>;

    /// Return the slot's signal to the unsignaled state before reuse.
    fn reset(&mut self, slot: usize) -> FrameResult<()>;
}

/// Result of asking the presentation engine for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Acquired(SwapchainImage),
    /// The swapchain no longer matches the surface.
    OutOfDate,
    /// No image became available in time.
    NotReady,
}

/// Result of queueing an image for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// The image was stale; the swapchain must be rebuilt.
    OutOfDate,
}

/// Presentation surface operations.
pub trait PresentationBackend {
    /// Acquire the next presentable image, signalling the slot's
    /// image-available semaphore.
    fn acquire(&mut self, slot: &AcquiredSlot<'_>) -> FrameResult<AcquireOutcome>;

    /// Queue `image` for presentation once the slot's rendering completes.
    fn present(
        &mut self,
        slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
    ) -> FrameResult<PresentOutcome>;

    /// Destroy and rebuild the swapchain. Returns the resolution actually
    /// chosen, which may differ from the request.
    fn recreate(&mut self, desired: PresentConfig) -> FrameResult<Resolution>;
}

/// Everything the frame driver needs from a graphics backend.
pub trait FrameBackend: CompletionSignals + PresentationBackend {
    /// Copy the frame parameters into the slot's uniform buffer.
    fn write_params(&mut self, slot: &AcquiredSlot<'_>, params: &FrameParams) -> FrameResult<()>;

    /// Record `plan` into the slot's command buffer.
    fn record(
        &mut self,
        slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
        plan: &FramePlan,
    ) -> FrameResult<()>;

    /// Submit the slot's command buffer. Waits on the slot's image-available
    /// signal, signals rendering-complete for `image` and the slot's fence.
    fn submit(&mut self, slot: &AcquiredSlot<'_>, image: &SwapchainImage) -> FrameResult<()>;

    /// Block until the device has finished all submitted work.
    fn wait_idle(&mut self) -> FrameResult<()>;
}

/// Windowing provider.
pub trait Windowing {
    /// Drain pending OS events.
    fn poll_events(&mut self);

    /// Current drawable size. Zero area while minimized.
    fn drawable_resolution(&self) -> Resolution;

    /// Whether a close was requested.
    fn is_closing(&self) -> bool;
}
