//! Simulated GPU and window for frame loop tests.

#![allow(dead_code)]

use std::time::Duration;

use inflight_core::{FrameParams, PresentConfig, Resolution};
use inflight_frame::{
    AcquireOutcome, AcquiredSlot, CompletionSignals, FrameBackend, FrameError, FramePlan,
    FrameResult, PresentOutcome, PresentationBackend, SignalStatus, SwapchainImage, Windowing,
};

const IMAGE_COUNT: u32 = 3;

/// Backend calls in the order they were made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Wait { slot: usize },
    Reset { slot: usize },
    Acquire { frame: u64 },
    Record { slot: usize },
    WriteParams { slot: usize },
    Submit { slot: usize },
    Present { frame: u64 },
    Recreate { resolution: Resolution },
    WaitIdle,
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub frame: u64,
    pub slot: usize,
    pub image: SwapchainImage,
    pub params: FrameParams,
    pub plan: FramePlan,
}

/// A GPU whose submissions stay pending until someone waits on them.
///
/// Touching a slot's resources while its work is pending panics.
pub struct MockGpu {
    pub calls: Vec<Call>,
    pub submissions: Vec<Submission>,
    pub recreated: Vec<PresentConfig>,
    pub surface: Resolution,
    /// Resolution the surface reports after every recreate.
    pub clamp: Option<Resolution>,
    /// Frames whose acquisition reports out of date.
    pub acquire_out_of_date: Vec<u64>,
    /// Frames whose acquisition reports not ready.
    pub acquire_not_ready: Vec<u64>,
    /// Frames whose presentation reports out of date.
    pub present_out_of_date: Vec<u64>,
    /// Completion waits never succeed.
    pub hung: bool,
    /// Frames whose command recording fails.
    pub record_failures: Vec<u64>,
    pending: Vec<Option<u64>>,
    next_image: u32,
    recorded: Option<FramePlan>,
    written: Option<FrameParams>,
}

impl MockGpu {
    pub fn new(slots: usize, surface: Resolution) -> Self {
        Self {
            calls: Vec::new(),
            submissions: Vec::new(),
            recreated: Vec::new(),
            surface,
            clamp: None,
            acquire_out_of_date: Vec::new(),
            acquire_not_ready: Vec::new(),
            present_out_of_date: Vec::new(),
            hung: false,
            record_failures: Vec::new(),
            pending: vec![None; slots],
            next_image: 0,
            recorded: None,
            written: None,
        }
    }

    pub fn pending(&self, slot: usize) -> Option<u64> {
        self.pending[slot]
    }

    pub fn any_pending(&self) -> bool {
        self.pending.iter().any(Option::is_some)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    fn assert_released(&self, slot: usize, what: &str) {
        assert!(
            self.pending[slot].is_none(),
            "{what} on slot {slot} while frame {:?} is in flight",
            self.pending[slot]
        );
    }
}

impl CompletionSignals for MockGpu {
    fn wait(&mut self, slot: usize, _timeout: Duration) -> FrameResult<SignalStatus> {
        self.calls.push(Call::Wait { slot });
        if self.hung {
            return Ok(SignalStatus::TimedOut);
        }
        self.pending[slot] = None;
        Ok(SignalStatus::Signaled)
    }

    fn reset(&mut self, slot: usize) -> FrameResult<()> {
        self.calls.push(Call::Reset { slot });
        self.assert_released(slot, "fence reset");
        Ok(())
    }
}

impl PresentationBackend for MockGpu {
    fn acquire(&mut self, slot: &AcquiredSlot<'_>) -> FrameResult<AcquireOutcome> {
        let frame = slot.frame_number();
        self.calls.push(Call::Acquire { frame });
        if self.acquire_out_of_date.contains(&frame) {
            return Ok(AcquireOutcome::OutOfDate);
        }
        if self.acquire_not_ready.contains(&frame) {
            return Ok(AcquireOutcome::NotReady);
        }
        let image = SwapchainImage::new(self.next_image, self.surface);
        self.next_image = (self.next_image + 1) % IMAGE_COUNT;
        Ok(AcquireOutcome::Acquired(image))
    }

    fn present(
        &mut self,
        slot: &AcquiredSlot<'_>,
        _image: &SwapchainImage,
    ) -> FrameResult<PresentOutcome> {
        let frame = slot.frame_number();
        self.calls.push(Call::Present { frame });
        if self.present_out_of_date.contains(&frame) {
            Ok(PresentOutcome::OutOfDate)
        } else {
            Ok(PresentOutcome::Presented)
        }
    }

    fn recreate(&mut self, desired: PresentConfig) -> FrameResult<Resolution> {
        assert!(!self.any_pending(), "swapchain recreated with work in flight");
        self.calls.push(Call::Recreate {
            resolution: desired.resolution,
        });
        self.recreated.push(desired);
        self.surface = self.clamp.unwrap_or(desired.resolution);
        self.next_image = 0;
        Ok(self.surface)
    }
}

impl FrameBackend for MockGpu {
    fn write_params(&mut self, slot: &AcquiredSlot<'_>, params: &FrameParams) -> FrameResult<()> {
        self.calls.push(Call::WriteParams { slot: slot.index() });
        self.assert_released(slot.index(), "uniform write");
        self.written = Some(*params);
        Ok(())
    }

    fn record(
        &mut self,
        slot: &AcquiredSlot<'_>,
        _image: &SwapchainImage,
        plan: &FramePlan,
    ) -> FrameResult<()> {
        self.calls.push(Call::Record { slot: slot.index() });
        self.assert_released(slot.index(), "command recording");
        if self.record_failures.contains(&slot.frame_number()) {
            return Err(FrameError::backend(std::io::Error::other(
                "command recording failed",
            )));
        }
        self.recorded = Some(plan.clone());
        Ok(())
    }

    fn submit(&mut self, slot: &AcquiredSlot<'_>, image: &SwapchainImage) -> FrameResult<()> {
        let index = slot.index();
        self.calls.push(Call::Submit { slot: index });
        self.assert_released(index, "submission");
        let plan = self.recorded.take().expect("submit without recording");
        let params = self.written.take().expect("submit without parameters");
        self.pending[index] = Some(slot.frame_number());
        self.submissions.push(Submission {
            frame: slot.frame_number(),
            slot: index,
            image: *image,
            params,
            plan,
        });
        Ok(())
    }

    fn wait_idle(&mut self) -> FrameResult<()> {
        self.calls.push(Call::WaitIdle);
        self.pending.iter_mut().for_each(|p| *p = None);
        Ok(())
    }
}

/// Scripted window.
pub struct MockWindow {
    pub size: Resolution,
    pub polls: u64,
    /// Close after this many polls.
    pub close_after: Option<u64>,
    /// Sizes applied when `polls` reaches the given count.
    pub resizes: Vec<(u64, Resolution)>,
}

impl MockWindow {
    pub fn new(size: Resolution) -> Self {
        Self {
            size,
            polls: 0,
            close_after: None,
            resizes: Vec::new(),
        }
    }
}

impl Windowing for MockWindow {
    fn poll_events(&mut self) {
        self.polls += 1;
        for &(at, size) in &self.resizes {
            if at == self.polls {
                self.size = size;
            }
        }
    }

    fn drawable_resolution(&self) -> Resolution {
        self.size
    }

    fn is_closing(&self) -> bool {
        self.close_after.is_some_and(|n| self.polls > n)
    }
}
