//! Frame-in-flight ring.
//!
//! A fixed number of slots is reused round-robin. Frame `k` always uses slot
//! `k mod N`, and the only way to obtain a slot is [`FrameRing::acquire`],
//! which first waits for the GPU to release the work submitted from that slot
//! `N` frames earlier. Holding an [`AcquiredSlot`] therefore proves its
//! resources are safe to overwrite.

use std::marker::PhantomData;

use crate::backend::CompletionSignals;
use crate::error::{FrameError, FrameResult};
use crate::sync::SyncCoordinator;

/// Round-robin ring of frame slots.
#[derive(Debug)]
pub struct FrameRing {
    slot_count: usize,
    frame_number: u64,
}

impl FrameRing {
    /// Create a ring with `slot_count` slots, starting at frame 0.
    pub fn new(slot_count: usize) -> FrameResult<Self> {
        if slot_count == 0 {
            return Err(FrameError::InvalidConfig(
                "frame ring needs at least one slot".to_string(),
            ));
        }
        Ok(Self {
            slot_count,
            frame_number: 0,
        })
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Current frame number.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }

    /// Slot used by the current frame.
    pub fn current_slot(&self) -> usize {
        (self.frame_number % self.slot_count as u64) as usize
    }

    /// Wait until the current slot's previous GPU work completed and hand it
    /// out for recording.
    pub fn acquire<S>(
        &mut self,
        sync: &mut SyncCoordinator,
        signals: &mut S,
    ) -> FrameResult<AcquiredSlot<'_>>
    where
        S: CompletionSignals + ?Sized,
    {
        let index = self.current_slot();
        sync.wait_for_slot(signals, index)?;
        Ok(AcquiredSlot {
            index,
            frame_number: self.frame_number,
            _ring: PhantomData,
        })
    }

    /// Move to the next frame. Called once per loop iteration, whether or not
    /// anything was submitted.
    pub fn advance(&mut self) {
        self.frame_number += 1;
    }
}

/// A slot whose previous GPU work is known to be complete.
///
/// Borrows the ring, so the ring cannot advance while a slot is held.
#[derive(Debug)]
pub struct AcquiredSlot<'r> {
    index: usize,
    frame_number: u64,
    _ring: PhantomData<&'r mut FrameRing>,
}

impl AcquiredSlot<'_> {
    /// Slot index in `0..slot_count`.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Frame number the slot was acquired for.
    pub fn frame_number(&self) -> u64 {
        self.frame_number
    }
}
