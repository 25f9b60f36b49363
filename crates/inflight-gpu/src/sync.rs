//! Synchronization primitives.

use crate::error::Result;
use ash::vk;
use std::time::Duration;

/// Outcome of a bounded fence wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceStatus {
    Signaled,
    TimedOut,
}

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    let semaphore = unsafe { device.create_semaphore(&create_info, None)? };
    Ok(semaphore)
}

/// Create a fence.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_fence(device: &ash::Device, signaled: bool) -> Result<vk::Fence> {
    let flags = if signaled {
        vk::FenceCreateFlags::SIGNALED
    } else {
        vk::FenceCreateFlags::empty()
    };

    let create_info = vk::FenceCreateInfo::default().flags(flags);
    let fence = unsafe { device.create_fence(&create_info, None)? };
    Ok(fence)
}

/// Wait for a fence, giving up after `timeout`.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn wait_for_fence(
    device: &ash::Device,
    fence: vk::Fence,
    timeout: Duration,
) -> Result<FenceStatus> {
    let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
    match unsafe { device.wait_for_fences(&[fence], true, timeout_ns) } {
        Ok(()) => Ok(FenceStatus::Signaled),
        Err(vk::Result::TIMEOUT) => Ok(FenceStatus::TimedOut),
        Err(e) => Err(e.into()),
    }
}

/// Reset a fence to unsignaled state.
///
/// # Safety
/// The device and fence must be valid.
pub unsafe fn reset_fence(device: &ash::Device, fence: vk::Fence) -> Result<()> {
    unsafe { device.reset_fences(&[fence])? };
    Ok(())
}

/// Synchronization objects owned by one frame slot.
pub struct FrameSync {
    /// Signaled when the slot's swapchain image is ready to be written.
    pub image_available: vk::Semaphore,
    /// Signaled when the slot's last submission completes.
    pub in_flight: vk::Fence,
}

impl FrameSync {
    /// Create slot synchronization objects. The fence starts unsignaled;
    /// a slot is only waited on after it has been submitted.
    ///
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        Ok(Self {
            image_available: unsafe { create_semaphore(device)? },
            in_flight: unsafe { create_fence(device, false)? },
        })
    }

    /// Destroy synchronization resources.
    ///
    /// # Safety
    /// The device must be valid and resources must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_fence(self.in_flight, None);
        }
    }
}
