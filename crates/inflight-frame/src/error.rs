//! Frame pipeline error types.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the frame pipeline.
///
/// Recoverable presentation conditions (out-of-date or not-ready swapchains)
/// are not errors; they are folded into the swapchain state machine.
#[derive(Error, Debug)]
pub enum FrameError {
    /// The GPU did not signal completion of a slot within the wait budget.
    #[error("Frame slot {slot} (submitted by frame {frame:?}) did not complete within {timeout:?}")]
    SlotTimeout {
        slot: usize,
        frame: Option<u64>,
        timeout: Duration,
    },

    /// Internal state machine reached a state it must never reach.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    /// Invalid driver configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error raised by the graphics backend.
    #[error("Backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl FrameError {
    /// Wrap a backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

/// Result type alias.
pub type FrameResult<T> = std::result::Result<T, FrameError>;
