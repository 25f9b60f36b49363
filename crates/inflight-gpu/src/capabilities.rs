//! GPU capability detection.

use crate::instance::is_vulkan_1_3;
use ash::vk;
use std::ffi::CStr;

/// GPU vendor identification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuVendor {
    Nvidia,
    Amd,
    Intel,
    Apple,
    Other(u32),
}

impl GpuVendor {
    /// Identify vendor from PCI vendor ID.
    pub fn from_vendor_id(id: u32) -> Self {
        match id {
            0x10DE => Self::Nvidia,
            0x1002 => Self::Amd,
            0x8086 => Self::Intel,
            0x106B => Self::Apple,
            other => Self::Other(other),
        }
    }
}

/// Detected GPU capabilities.
#[derive(Debug, Clone)]
pub struct GpuCapabilities {
    /// GPU vendor
    pub vendor: GpuVendor,
    /// Device name
    pub device_name: String,
    /// Vulkan API version
    pub api_version: u32,
    /// Driver version
    pub driver_version: u32,

    /// Dynamic rendering support (VK 1.3 core)
    pub supports_dynamic_rendering: bool,
    /// Synchronization2 support (VK 1.3 core)
    pub supports_synchronization2: bool,

    /// Device-local memory in MB
    pub device_local_memory_mb: u64,
    /// Maximum compute workgroup size
    pub max_compute_workgroup_size: [u32; 3],
    /// Maximum compute workgroup invocations
    pub max_compute_workgroup_invocations: u32,
    /// Maximum 2D image dimension
    pub max_image_dimension_2d: u32,
}

impl GpuCapabilities {
    /// Query capabilities from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
        let mut features2 = vk::PhysicalDeviceFeatures2::default().push_next(&mut features13);
        if is_vulkan_1_3(properties.api_version) {
            unsafe { instance.get_physical_device_features2(physical_device, &mut features2) };
        }
        let supports_dynamic_rendering = features13.dynamic_rendering == vk::TRUE;
        let supports_synchronization2 = features13.synchronization2 == vk::TRUE;

        let device_name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned();

        let device_local_memory_mb: u64 = memory_properties
            .memory_heaps
            .iter()
            .take(memory_properties.memory_heap_count as usize)
            .filter(|heap| heap.flags.contains(vk::MemoryHeapFlags::DEVICE_LOCAL))
            .map(|heap| heap.size / (1024 * 1024))
            .sum();

        Self {
            vendor: GpuVendor::from_vendor_id(properties.vendor_id),
            device_name,
            api_version: properties.api_version,
            driver_version: properties.driver_version,
            supports_dynamic_rendering,
            supports_synchronization2,
            device_local_memory_mb,
            max_compute_workgroup_size: properties.limits.max_compute_work_group_size,
            max_compute_workgroup_invocations: properties.limits.max_compute_work_group_invocations,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
        }
    }

    /// Check if the GPU can run the renderer.
    pub fn meets_requirements(&self) -> bool {
        is_vulkan_1_3(self.api_version)
            && self.supports_dynamic_rendering
            && self.supports_synchronization2
    }

    /// Check whether a compute workgroup of the given size fits the limits.
    pub fn supports_workgroup(&self, size: [u32; 2]) -> bool {
        size[0] <= self.max_compute_workgroup_size[0]
            && size[1] <= self.max_compute_workgroup_size[1]
            && size[0] * size[1] <= self.max_compute_workgroup_invocations
    }

    /// Get a human-readable summary of capabilities.
    pub fn summary(&self) -> String {
        format!(
            "{} ({:?}) - Vulkan {}.{}.{} - {} MB VRAM",
            self.device_name,
            self.vendor,
            vk::api_version_major(self.api_version),
            vk::api_version_minor(self.api_version),
            vk::api_version_patch(self.api_version),
            self.device_local_memory_mb,
        )
    }
}
