//! GPU context management.

use crate::capabilities::GpuCapabilities;
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, select_physical_device};
use crate::memory::GpuAllocator;
use ash::vk;
use parking_lot::Mutex;
use raw_window_handle::RawDisplayHandle;
use std::sync::Arc;

/// Main GPU context holding Vulkan resources.
///
/// Compute, graphics and presentation share one queue, so the frame's
/// compute-to-fragment dependency is a plain pipeline barrier.
pub struct GpuContext {
    // Entry must be kept alive for the lifetime of the context
    pub(crate) entry: ash::Entry,
    pub(crate) instance: ash::Instance,
    pub(crate) physical_device: vk::PhysicalDevice,
    pub(crate) device: Arc<ash::Device>,
    pub(crate) capabilities: GpuCapabilities,
    pub(crate) allocator: Mutex<GpuAllocator>,
    pub(crate) queue_family: u32,
    pub(crate) queue: vk::Queue,
}

impl GpuContext {
    /// Get the Vulkan entry point.
    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    /// Get the Vulkan device handle.
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    /// Get the physical device handle.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Get GPU capabilities.
    pub fn capabilities(&self) -> &GpuCapabilities {
        &self.capabilities
    }

    /// Get the graphics/compute/present queue.
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }

    /// Get the Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Get access to the GPU allocator.
    pub fn allocator(&self) -> &Mutex<GpuAllocator> {
        &self.allocator
    }

    /// Wait for device to be idle.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            // Shutdown allocator BEFORE destroying device
            self.allocator.lock().shutdown();

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}

/// Builder for creating a GPU context.
pub struct GpuContextBuilder {
    app_name: String,
    enable_validation: bool,
    display: Option<RawDisplayHandle>,
}

impl Default for GpuContextBuilder {
    fn default() -> Self {
        Self {
            app_name: "inflight".to_string(),
            enable_validation: cfg!(debug_assertions),
            display: None,
        }
    }
}

impl GpuContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    #[must_use]
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    #[must_use]
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Enable the surface extensions this display needs.
    #[must_use]
    pub fn display(mut self, display: RawDisplayHandle) -> Self {
        self.display = Some(display);
        self
    }

    /// Build the GPU context.
    pub fn build(self) -> Result<GpuContext> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| GpuError::Other(format!("Failed to load Vulkan: {e}")))?;

        let instance = unsafe {
            create_instance(
                &entry,
                &self.app_name,
                self.display,
                self.enable_validation,
            )
        }?;

        let physical_device = unsafe { select_physical_device(&instance) }?;
        let capabilities = unsafe { GpuCapabilities::query(&instance, physical_device) };

        if !capabilities.meets_requirements() {
            unsafe { instance.destroy_instance(None) };
            return Err(GpuError::NoSuitableDevice);
        }

        tracing::info!("Selected GPU: {}", capabilities.summary());

        let queue_family = match unsafe { find_queue_family(&instance, physical_device) } {
            Ok(family) => family,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };

        let (device, queue) = match unsafe { create_device(&instance, physical_device, queue_family) }
        {
            Ok(created) => created,
            Err(e) => {
                unsafe { instance.destroy_instance(None) };
                return Err(e);
            }
        };
        let device = Arc::new(device);

        let allocator = match unsafe { GpuAllocator::new(&instance, device.clone(), physical_device) }
        {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe {
                    device.destroy_device(None);
                    instance.destroy_instance(None);
                }
                return Err(e);
            }
        };

        Ok(GpuContext {
            entry,
            instance,
            physical_device,
            device,
            capabilities,
            allocator: Mutex::new(allocator),
            queue_family,
            queue,
        })
    }
}

/// Find a queue family supporting both graphics and compute.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn find_queue_family(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Result<u32> {
    let families =
        unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
    let required = vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE;

    families
        .iter()
        .position(|family| family.queue_flags.contains(required))
        .map(|i| i as u32)
        .ok_or(GpuError::NoSuitableDevice)
}

/// Create the logical device and retrieve its queue.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
) -> Result<(ash::Device, vk::Queue)> {
    let queue_priority = 1.0_f32;
    let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(queue_family)
        .queue_priorities(std::slice::from_ref(&queue_priority))];

    let extension_names = [ash::khr::swapchain::NAME.as_ptr()];

    let mut vulkan_1_3_features = vk::PhysicalDeviceVulkan13Features::default()
        .dynamic_rendering(true)
        .synchronization2(true);

    let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut vulkan_1_3_features);

    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .push_next(&mut features2);

    let device = unsafe {
        instance
            .create_device(physical_device, &device_create_info, None)
            .map_err(GpuError::from)?
    };

    let queue = unsafe { device.get_device_queue(queue_family, 0) };

    Ok((device, queue))
}
