//! Per-slot GPU resources.

use ash::vk;
use gpu_allocator::MemoryLocation;
use inflight_core::FrameParams;
use inflight_gpu::{DescriptorPool, FrameSync, GpuContext, GpuBuffer, Result};

/// Descriptor sets allocated per slot and frame: one compute, one composite.
const SETS_PER_SLOT: u32 = 2;

/// Resources one frame slot owns for the lifetime of the renderer.
pub struct SlotResources {
    pub command_buffer: vk::CommandBuffer,
    pub sync: FrameSync,
    /// Frame parameters read by both passes.
    pub params: GpuBuffer,
    /// Reset every time the slot records.
    pub descriptors: DescriptorPool,
}

impl SlotResources {
    /// # Safety
    /// The GPU context must be valid.
    pub unsafe fn new(gpu: &GpuContext, index: usize, command_buffer: vk::CommandBuffer) -> Result<Self> {
        let device = gpu.device();
        let sync = unsafe { FrameSync::new(device)? };

        let params = gpu.allocator().lock().create_buffer(
            FrameParams::SIZE,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
            &format!("frame params {index}"),
        );
        let mut params = match params {
            Ok(params) => params,
            Err(e) => {
                unsafe { sync.destroy(device) };
                return Err(e);
            }
        };

        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_IMAGE,
                descriptor_count: 1,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 2,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: SETS_PER_SLOT,
            },
        ];
        let descriptors = match unsafe { DescriptorPool::new(device, SETS_PER_SLOT, &pool_sizes) } {
            Ok(pool) => pool,
            Err(e) => {
                log_free_failure(gpu.allocator().lock().free_buffer(&mut params));
                unsafe { sync.destroy(device) };
                return Err(e);
            }
        };

        Ok(Self {
            command_buffer,
            sync,
            params,
            descriptors,
        })
    }

    /// Release everything except the command buffer, which goes with its pool.
    ///
    /// # Safety
    /// The slot must not be in use by the GPU.
    pub unsafe fn destroy(&mut self, gpu: &GpuContext) {
        let device = gpu.device();
        unsafe {
            self.descriptors.destroy(device);
            self.sync.destroy(device);
        }
        log_free_failure(gpu.allocator().lock().free_buffer(&mut self.params));
    }
}

fn log_free_failure(result: Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Failed to free frame params buffer: {e}");
    }
}
