//! CPU/GPU synchronization bookkeeping.
//!
//! Each slot moves through `Idle -> Recording -> Submitted -> Idle`. The
//! coordinator tracks that cycle and drives the backend's completion signals:
//! it waits on a slot's signal only when the slot has outstanding work, and
//! resets the signal right before the slot is recorded again. A recording
//! that fails before submission returns its slot straight to `Idle`.

use std::time::Duration;

use tracing::{debug, warn};

use crate::backend::{CompletionSignals, SignalStatus};
use crate::error::{FrameError, FrameResult};

/// Lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No outstanding GPU work.
    Idle,
    /// Commands are being recorded.
    Recording,
    /// Work submitted; completion not yet observed.
    Submitted,
}

#[derive(Debug, Clone, Copy)]
struct SlotTracker {
    state: SlotState,
    /// Frame that last submitted from this slot.
    token: Option<u64>,
}

/// Tracks per-slot completion state.
#[derive(Debug)]
pub struct SyncCoordinator {
    slots: Vec<SlotTracker>,
    timeout: Duration,
}

impl SyncCoordinator {
    /// Create a coordinator for `slot_count` slots, all idle.
    pub fn new(slot_count: usize, timeout: Duration) -> Self {
        Self {
            slots: vec![
                SlotTracker {
                    state: SlotState::Idle,
                    token: None,
                };
                slot_count
            ],
            timeout,
        }
    }

    /// Number of tracked slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Wait budget used for completion waits.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// State of `slot`.
    pub fn state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).map(|s| s.state)
    }

    /// Frame that last submitted from `slot`.
    pub fn token(&self, slot: usize) -> Option<u64> {
        self.slots.get(slot).and_then(|s| s.token)
    }

    /// Number of slots with unobserved GPU work.
    pub fn in_flight(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.state == SlotState::Submitted)
            .count()
    }

    fn tracker_mut(&mut self, slot: usize) -> FrameResult<&mut SlotTracker> {
        let count = self.slots.len();
        self.slots
            .get_mut(slot)
            .ok_or_else(|| FrameError::invariant(format!("slot {slot} out of range ({count})")))
    }

    /// Block until the slot's previous submission has completed.
    ///
    /// Returns immediately for an idle slot. A slot that is still recording
    /// cannot be waited on.
    pub fn wait_for_slot<S>(&mut self, signals: &mut S, slot: usize) -> FrameResult<()>
    where
        S: CompletionSignals + ?Sized,
    {
        let timeout = self.timeout;
        let tracker = self.tracker_mut(slot)?;
        match tracker.state {
            SlotState::Idle => Ok(()),
            SlotState::Recording => Err(FrameError::invariant(format!(
                "slot {slot} waited on while recording"
            ))),
            SlotState::Submitted => match signals.wait(slot, timeout)? {
                SignalStatus::Signaled => {
                    tracker.state = SlotState::Idle;
                    Ok(())
                }
                SignalStatus::TimedOut => {
                    warn!(slot, frame = ?tracker.token, "GPU completion wait timed out");
                    Err(FrameError::SlotTimeout {
                        slot,
                        frame: tracker.token,
                        timeout,
                    })
                }
            },
        }
    }

    /// Reset the slot's completion signal and mark it recording.
    pub fn begin_recording<S>(&mut self, signals: &mut S, slot: usize) -> FrameResult<()>
    where
        S: CompletionSignals + ?Sized,
    {
        let tracker = self.tracker_mut(slot)?;
        if tracker.state != SlotState::Idle {
            return Err(FrameError::invariant(format!(
                "slot {slot} reused while {:?}",
                tracker.state
            )));
        }
        signals.reset(slot)?;
        tracker.state = SlotState::Recording;
        Ok(())
    }

    /// Record that `frame` submitted the slot's work.
    pub fn mark_submitted(&mut self, slot: usize, frame: u64) -> FrameResult<()> {
        let tracker = self.tracker_mut(slot)?;
        if tracker.state != SlotState::Recording {
            return Err(FrameError::invariant(format!(
                "slot {slot} submitted while {:?}",
                tracker.state
            )));
        }
        tracker.state = SlotState::Submitted;
        tracker.token = Some(frame);
        Ok(())
    }

    /// Return a slot whose recording failed before submission to idle.
    ///
    /// Nothing was queued, so the reset signal is never waited on.
    pub fn abort_recording(&mut self, slot: usize) -> FrameResult<()> {
        let tracker = self.tracker_mut(slot)?;
        if tracker.state != SlotState::Recording {
            return Err(FrameError::invariant(format!(
                "slot {slot} aborted while {:?}",
                tracker.state
            )));
        }
        debug!(slot, "Abandoned unsubmitted recording");
        tracker.state = SlotState::Idle;
        Ok(())
    }

    /// Wait for every slot with outstanding work. Used before teardown.
    ///
    /// Keeps waiting on the remaining slots after a failure and reports the
    /// first error.
    pub fn wait_all<S>(&mut self, signals: &mut S) -> FrameResult<()>
    where
        S: CompletionSignals + ?Sized,
    {
        let mut first_error = None;
        for slot in 0..self.slots.len() {
            if let Err(e) = self.wait_for_slot(signals, slot) {
                first_error.get_or_insert(e);
            }
        }
        debug!(in_flight = self.in_flight(), "Waited for all frame slots");
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorded {
        waits: Vec<usize>,
        resets: Vec<usize>,
        hung: bool,
    }

    impl CompletionSignals for Recorded {
        fn wait(&mut self, slot: usize, _timeout: Duration) -> FrameResult<SignalStatus> {
            self.waits.push(slot);
            Ok(if self.hung {
                SignalStatus::TimedOut
            } else {
                SignalStatus::Signaled
            })
        }

        fn reset(&mut self, slot: usize) -> FrameResult<()> {
            self.resets.push(slot);
            Ok(())
        }
    }

    #[test]
    fn idle_slot_skips_wait() {
        let mut sync = SyncCoordinator::new(2, Duration::from_millis(10));
        let mut signals = Recorded::default();
        sync.wait_for_slot(&mut signals, 0).unwrap();
        assert!(signals.waits.is_empty());
    }

    #[test]
    fn slot_lifecycle() {
        let mut sync = SyncCoordinator::new(2, Duration::from_millis(10));
        let mut signals = Recorded::default();

        sync.begin_recording(&mut signals, 1).unwrap();
        assert_eq!(sync.state(1), Some(SlotState::Recording));
        assert_eq!(signals.resets, vec![1]);

        sync.mark_submitted(1, 7).unwrap();
        assert_eq!(sync.state(1), Some(SlotState::Submitted));
        assert_eq!(sync.token(1), Some(7));
        assert_eq!(sync.in_flight(), 1);

        sync.wait_for_slot(&mut signals, 1).unwrap();
        assert_eq!(signals.waits, vec![1]);
        assert_eq!(sync.state(1), Some(SlotState::Idle));
    }

    #[test]
    fn reuse_without_wait_is_rejected() {
        let mut sync = SyncCoordinator::new(1, Duration::from_millis(10));
        let mut signals = Recorded::default();
        sync.begin_recording(&mut signals, 0).unwrap();
        sync.mark_submitted(0, 0).unwrap();

        let err = sync.begin_recording(&mut signals, 0).unwrap_err();
        assert!(matches!(err, FrameError::InvariantViolation(_)));
    }

    #[test]
    fn wait_while_recording_is_rejected() {
        let mut sync = SyncCoordinator::new(1, Duration::from_millis(10));
        let mut signals = Recorded::default();
        sync.begin_recording(&mut signals, 0).unwrap();
        assert!(matches!(
            sync.wait_for_slot(&mut signals, 0),
            Err(FrameError::InvariantViolation(_))
        ));
    }

    #[test]
    fn aborted_recording_returns_to_idle() {
        let mut sync = SyncCoordinator::new(1, Duration::from_millis(10));
        let mut signals = Recorded::default();
        sync.begin_recording(&mut signals, 0).unwrap();
        sync.abort_recording(0).unwrap();
        assert_eq!(sync.state(0), Some(SlotState::Idle));
        assert_eq!(sync.token(0), None);

        sync.wait_all(&mut signals).unwrap();
        assert!(signals.waits.is_empty());
        sync.begin_recording(&mut signals, 0).unwrap();
        assert_eq!(signals.resets, vec![0, 0]);
    }

    #[test]
    fn abort_outside_recording_is_rejected() {
        let mut sync = SyncCoordinator::new(1, Duration::from_millis(10));
        let mut signals = Recorded::default();
        assert!(matches!(
            sync.abort_recording(0),
            Err(FrameError::InvariantViolation(_))
        ));
        sync.begin_recording(&mut signals, 0).unwrap();
        sync.mark_submitted(0, 0).unwrap();
        assert!(sync.abort_recording(0).is_err());
        assert_eq!(sync.state(0), Some(SlotState::Submitted));
    }

    #[test]
    fn timeout_reports_slot_and_frame() {
        let mut sync = SyncCoordinator::new(2, Duration::from_millis(10));
        let mut signals = Recorded::default();
        sync.begin_recording(&mut signals, 1).unwrap();
        sync.mark_submitted(1, 3).unwrap();

        signals.hung = true;
        match sync.wait_for_slot(&mut signals, 1) {
            Err(FrameError::SlotTimeout {
                slot,
                frame,
                timeout,
            }) => {
                assert_eq!(slot, 1);
                assert_eq!(frame, Some(3));
                assert_eq!(timeout, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
        assert_eq!(sync.state(1), Some(SlotState::Submitted));
    }

    #[test]
    fn out_of_range_slot() {
        let mut sync = SyncCoordinator::new(2, Duration::from_millis(10));
        assert!(sync.mark_submitted(5, 0).is_err());
    }

    #[test]
    fn wait_all_drains_submitted_slots() {
        let mut sync = SyncCoordinator::new(3, Duration::from_millis(10));
        let mut signals = Recorded::default();
        for slot in [0, 2] {
            sync.begin_recording(&mut signals, slot).unwrap();
            sync.mark_submitted(slot, slot as u64).unwrap();
        }

        sync.wait_all(&mut signals).unwrap();
        assert_eq!(signals.waits, vec![0, 2]);
        assert_eq!(sync.in_flight(), 0);
    }
}
