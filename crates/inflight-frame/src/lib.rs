//! Frame pipeline for the inflight frames renderer.
//!
//! This crate holds everything about a frame that does not depend on a
//! graphics API:
//! - [`FrameRing`]: round-robin frame slots
//! - [`SyncCoordinator`]: per-slot completion tracking
//! - [`SwapchainLifecycle`]: swapchain validity and recreation
//! - [`CommandRecorder`]: per-frame command plans
//! - [`FrameDriver`]: the per-frame control flow
//!
//! Graphics backends plug in through the traits in [`backend`].

pub mod backend;
pub mod driver;
pub mod error;
pub mod recorder;
pub mod ring;
pub mod swapchain;
pub mod sync;

pub use backend::{
    AcquireOutcome, CompletionSignals, FrameBackend, PresentOutcome, PresentationBackend,
    SignalStatus, Windowing,
};
pub use driver::{DriverConfig, FrameDriver, FrameReport, FrameStats};
pub use error::{FrameError, FrameResult};
pub use recorder::{
    dispatch_size, Access, BoundResource, CommandRecorder, DescriptorBindings, FrameCommand,
    FramePlan, ImageLayout, ImageTarget, SamplerKind, Transition,
};
pub use ring::{AcquiredSlot, FrameRing};
pub use swapchain::{SwapchainImage, SwapchainLifecycle, SwapchainState};
pub use sync::{SlotState, SyncCoordinator};
