//! Vulkan abstraction layer for the inflight frames renderer.
//!
//! This crate provides:
//! - Vulkan instance and device management
//! - GPU capability detection
//! - Memory allocation via gpu-allocator
//! - Command buffer, descriptor and pipeline helpers
//! - Surface and swapchain handling
//! - Image barriers (synchronization2)

pub mod barrier;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod sampler;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use barrier::{color_subresource_range, image_barrier, ImageBarrier};
pub use capabilities::{GpuCapabilities, GpuVendor};
pub use command::{
    begin_command_buffer, end_command_buffer, execute_single_time_commands, submit_command_buffer,
    CommandPool,
};
pub use context::{GpuContext, GpuContextBuilder};
pub use descriptors::{
    write_combined_image_sampler, write_storage_image, write_uniform_buffer, DescriptorPool,
    DescriptorSetLayoutBuilder,
};
pub use error::{GpuError, Result};
pub use memory::{GpuAllocator, GpuBuffer, GpuImage};
pub use pipeline::{ComputePipeline, GraphicsPipeline, GraphicsPipelineConfig};
pub use sampler::create_sampler;
pub use surface::{SurfaceCapabilities, SurfaceContext};
pub use swapchain::{AcquiredImage, PresentResult, Swapchain};
pub use sync::{
    create_fence, create_semaphore, reset_fence, wait_for_fence, FenceStatus, FrameSync,
};
