//! Swapchain lifecycle state machine.
//!
//! Tracks whether the presentable image set still matches the surface.
//! Out-of-date acquisition, not-ready acquisition, stale presentation and
//! window resizes all invalidate it; the frame driver recreates it once per
//! invalidation, never while the window has zero area.

use inflight_core::{PresentConfig, Resolution};
use tracing::{debug, info};

use crate::backend::{AcquireOutcome, PresentOutcome, PresentationBackend};
use crate::error::{FrameError, FrameResult};
use crate::ring::AcquiredSlot;

/// Swapchain validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapchainState {
    Valid,
    Invalidated,
}

/// A presentable image handed out by the presentation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainImage {
    index: u32,
    resolution: Resolution,
}

impl SwapchainImage {
    pub fn new(index: u32, resolution: Resolution) -> Self {
        Self { index, resolution }
    }

    /// Index into the swapchain's image array.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// Owns the swapchain's validity and desired configuration.
#[derive(Debug)]
pub struct SwapchainLifecycle {
    state: SwapchainState,
    desired: PresentConfig,
    resolution: Resolution,
    recreations: u64,
}

impl SwapchainLifecycle {
    /// Start tracking a swapchain that was created at `actual`.
    pub fn new(desired: PresentConfig, actual: Resolution) -> Self {
        Self {
            state: SwapchainState::Valid,
            desired,
            resolution: actual,
            recreations: 0,
        }
    }

    pub fn state(&self) -> SwapchainState {
        self.state
    }

    /// Whether the swapchain must be rebuilt before the next acquisition.
    pub fn needs_recreation(&self) -> bool {
        self.state == SwapchainState::Invalidated
    }

    /// Resolution of the current image set.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Configuration requested on the next rebuild.
    pub fn desired(&self) -> PresentConfig {
        self.desired
    }

    /// Number of completed rebuilds.
    pub fn recreations(&self) -> u64 {
        self.recreations
    }

    /// Mark the swapchain stale.
    pub fn invalidate(&mut self, reason: &str) {
        if self.state == SwapchainState::Valid {
            debug!(reason, "Swapchain invalidated");
            self.state = SwapchainState::Invalidated;
        }
    }

    /// Track the window's drawable size. A change invalidates the swapchain;
    /// zero-area sizes are ignored so a minimized window keeps its last size.
    pub fn set_desired_resolution(&mut self, resolution: Resolution) {
        if resolution.is_zero_area() || resolution == self.desired.resolution {
            return;
        }
        self.desired.resolution = resolution;
        if resolution != self.resolution {
            self.invalidate("window resized");
        }
    }

    /// Acquire the next presentable image.
    ///
    /// Returns `None` without touching the backend when the window has zero
    /// area or the swapchain is already invalidated. Out-of-date and
    /// not-ready results invalidate the swapchain and also yield `None`.
    pub fn acquire_next<B>(
        &mut self,
        backend: &mut B,
        slot: &AcquiredSlot<'_>,
        window: Resolution,
    ) -> FrameResult<Option<SwapchainImage>>
    where
        B: PresentationBackend + ?Sized,
    {
        if window.is_zero_area() || self.needs_recreation() {
            return Ok(None);
        }
        match backend.acquire(slot)? {
            AcquireOutcome::Acquired(image) => Ok(Some(image)),
            AcquireOutcome::OutOfDate => {
                self.invalidate("acquire reported out of date");
                Ok(None)
            }
            AcquireOutcome::NotReady => {
                self.invalidate("no image ready");
                Ok(None)
            }
        }
    }

    /// Queue `image` for presentation. Returns whether it was presented.
    pub fn present<B>(
        &mut self,
        backend: &mut B,
        slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
    ) -> FrameResult<bool>
    where
        B: PresentationBackend + ?Sized,
    {
        match backend.present(slot, image)? {
            PresentOutcome::Presented => Ok(true),
            PresentOutcome::OutOfDate => {
                self.invalidate("present reported out of date");
                Ok(false)
            }
        }
    }

    /// Rebuild the swapchain at the desired configuration and adopt the
    /// resolution the backend actually chose.
    pub fn recreate<B>(&mut self, backend: &mut B) -> FrameResult<Resolution>
    where
        B: PresentationBackend + ?Sized,
    {
        if self.desired.resolution.is_zero_area() {
            return Err(FrameError::invariant(
                "swapchain recreation requested at zero area",
            ));
        }
        let actual = backend.recreate(self.desired)?;
        if actual.is_zero_area() {
            return Err(FrameError::invariant(format!(
                "swapchain recreated at zero area (requested {})",
                self.desired.resolution
            )));
        }
        if actual != self.desired.resolution {
            debug!(
                requested = %self.desired.resolution,
                actual = %actual,
                "Surface chose a different extent"
            );
        }
        self.resolution = actual;
        self.state = SwapchainState::Valid;
        self.recreations += 1;
        info!("Swapchain recreated at {actual}");
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CompletionSignals, SignalStatus};
    use crate::ring::FrameRing;
    use crate::sync::SyncCoordinator;
    use std::time::Duration;

    struct Surface {
        acquire: AcquireOutcome,
        present: PresentOutcome,
        acquires: usize,
        recreated: Vec<PresentConfig>,
        clamp: Option<Resolution>,
    }

    impl Surface {
        fn new() -> Self {
            Self {
                acquire: AcquireOutcome::Acquired(SwapchainImage::new(0, Resolution::new(64, 64))),
                present: PresentOutcome::Presented,
                acquires: 0,
                recreated: Vec::new(),
                clamp: None,
            }
        }
    }

    impl CompletionSignals for Surface {
        fn wait(&mut self, _slot: usize, _timeout: Duration) -> FrameResult<SignalStatus> {
            Ok(SignalStatus::Signaled)
        }

        fn reset(&mut self, _slot: usize) -> FrameResult<()> {
            Ok(())
        }
    }

    impl PresentationBackend for Surface {
        fn acquire(&mut self, _slot: &AcquiredSlot<'_>) -> FrameResult<AcquireOutcome> {
            self.acquires += 1;
            Ok(self.acquire)
        }

        fn present(
            &mut self,
            _slot: &AcquiredSlot<'_>,
            _image: &SwapchainImage,
        ) -> FrameResult<PresentOutcome> {
            Ok(self.present)
        }

        fn recreate(&mut self, desired: PresentConfig) -> FrameResult<Resolution> {
            self.recreated.push(desired);
            Ok(self.clamp.unwrap_or(desired.resolution))
        }
    }

    fn lifecycle() -> SwapchainLifecycle {
        let size = Resolution::new(64, 64);
        SwapchainLifecycle::new(PresentConfig::new(size, false), size)
    }

    #[test]
    fn out_of_date_acquire_invalidates() {
        let mut ring = FrameRing::new(1).unwrap();
        let mut sync = SyncCoordinator::new(1, Duration::from_secs(1));
        let mut surface = Surface::new();
        surface.acquire = AcquireOutcome::OutOfDate;
        let mut swapchain = lifecycle();

        let slot = ring.acquire(&mut sync, &mut surface).unwrap();
        let image = swapchain
            .acquire_next(&mut surface, &slot, Resolution::new(64, 64))
            .unwrap();
        assert!(image.is_none());
        assert!(swapchain.needs_recreation());

        // Invalidated swapchains are not asked again.
        let image = swapchain
            .acquire_next(&mut surface, &slot, Resolution::new(64, 64))
            .unwrap();
        assert!(image.is_none());
        assert_eq!(surface.acquires, 1);
    }

    #[test]
    fn not_ready_invalidates() {
        let mut ring = FrameRing::new(1).unwrap();
        let mut sync = SyncCoordinator::new(1, Duration::from_secs(1));
        let mut surface = Surface::new();
        surface.acquire = AcquireOutcome::NotReady;
        let mut swapchain = lifecycle();

        let slot = ring.acquire(&mut sync, &mut surface).unwrap();
        let image = swapchain
            .acquire_next(&mut surface, &slot, Resolution::new(64, 64))
            .unwrap();
        assert!(image.is_none());
        assert_eq!(swapchain.state(), SwapchainState::Invalidated);
    }

    #[test]
    fn zero_area_skips_backend() {
        let mut ring = FrameRing::new(1).unwrap();
        let mut sync = SyncCoordinator::new(1, Duration::from_secs(1));
        let mut surface = Surface::new();
        let mut swapchain = lifecycle();

        let slot = ring.acquire(&mut sync, &mut surface).unwrap();
        let image = swapchain
            .acquire_next(&mut surface, &slot, Resolution::new(0, 0))
            .unwrap();
        assert!(image.is_none());
        assert_eq!(surface.acquires, 0);
        assert_eq!(swapchain.state(), SwapchainState::Valid);
    }

    #[test]
    fn stale_present_invalidates() {
        let mut ring = FrameRing::new(1).unwrap();
        let mut sync = SyncCoordinator::new(1, Duration::from_secs(1));
        let mut surface = Surface::new();
        surface.present = PresentOutcome::OutOfDate;
        let mut swapchain = lifecycle();

        let slot = ring.acquire(&mut sync, &mut surface).unwrap();
        let image = SwapchainImage::new(0, Resolution::new(64, 64));
        assert!(!swapchain.present(&mut surface, &slot, &image).unwrap());
        assert!(swapchain.needs_recreation());
    }

    #[test]
    fn resize_invalidates_once() {
        let mut swapchain = lifecycle();
        swapchain.set_desired_resolution(Resolution::new(0, 0));
        assert_eq!(swapchain.state(), SwapchainState::Valid);

        swapchain.set_desired_resolution(Resolution::new(128, 96));
        assert!(swapchain.needs_recreation());
        assert_eq!(swapchain.desired().resolution, Resolution::new(128, 96));
    }

    #[test]
    fn recreate_adopts_actual_resolution() {
        let mut surface = Surface::new();
        surface.clamp = Some(Resolution::new(120, 90));
        let mut swapchain = lifecycle();
        swapchain.set_desired_resolution(Resolution::new(128, 96));

        let actual = swapchain.recreate(&mut surface).unwrap();
        assert_eq!(actual, Resolution::new(120, 90));
        assert_eq!(swapchain.resolution(), actual);
        assert_eq!(swapchain.state(), SwapchainState::Valid);
        assert_eq!(swapchain.recreations(), 1);
        assert_eq!(surface.recreated[0].resolution, Resolution::new(128, 96));
    }

    #[test]
    fn recreate_twice_is_stable() {
        let mut surface = Surface::new();
        let mut swapchain = lifecycle();
        swapchain.invalidate("test");

        let first = swapchain.recreate(&mut surface).unwrap();
        let second = swapchain.recreate(&mut surface).unwrap();
        assert_eq!(first, second);
        assert_eq!(swapchain.state(), SwapchainState::Valid);
    }

    #[test]
    fn zero_area_recreate_is_invariant_violation() {
        let mut surface = Surface::new();
        surface.clamp = Some(Resolution::new(0, 0));
        let mut swapchain = lifecycle();
        swapchain.invalidate("test");

        assert!(matches!(
            swapchain.recreate(&mut surface),
            Err(FrameError::InvariantViolation(_))
        ));
    }
}
