//! Vulkan instance creation.

use crate::error::{GpuError, Result};
use ash::vk;
use raw_window_handle::RawDisplayHandle;
use std::ffi::{c_char, CStr, CString};

/// Instance extensions needed to present to a display.
///
/// Uses the display's own requirements when one is given, otherwise every
/// surface extension of the current platform.
pub fn required_instance_extensions(display: Option<RawDisplayHandle>) -> Result<Vec<*const c_char>> {
    let extensions: Vec<*const c_char> = match display {
        Some(display) => ash_window::enumerate_required_extensions(display)
            .map_err(GpuError::from)?
            .to_vec(),
        None => platform_surface_extensions()
            .iter()
            .map(|ext| ext.as_ptr())
            .collect(),
    };

    // Required for MoltenVK
    #[cfg(target_os = "macos")]
    let extensions = {
        let mut extensions = extensions;
        extensions.push(ash::khr::portability_enumeration::NAME.as_ptr());
        extensions
    };

    Ok(extensions)
}

fn platform_surface_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::xlib_surface::NAME,
        #[cfg(target_os = "linux")]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
    ]
}

/// Validation layers enabled on request.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Create a Vulkan 1.3 instance.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    display: Option<RawDisplayHandle>,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name)
        .map_err(|e| GpuError::Other(format!("Invalid application name: {e}")))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"inflight")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_3);

    let extension_names = required_instance_extensions(display)?;

    let requested = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };

    // Missing layers are skipped rather than failing instance creation
    let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
    let layers: Vec<&CStr> = requested
        .into_iter()
        .filter(|layer| {
            let found = available_layers.iter().any(|props| {
                props.layer_name_as_c_str().is_ok_and(|name| name == *layer)
            });
            if !found {
                tracing::warn!("Validation layer {:?} not available", layer);
            }
            found
        })
        .collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    let instance = unsafe { entry.create_instance(&create_info, None)? };

    Ok(instance)
}

/// Select the best Vulkan 1.3 physical device.
///
/// # Safety
/// The instance must be valid.
pub unsafe fn select_physical_device(instance: &ash::Instance) -> Result<vk::PhysicalDevice> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    devices
        .into_iter()
        .map(|device| (unsafe { score_physical_device(instance, device) }, device))
        .filter(|(score, _)| *score >= 0)
        .max_by_key(|(score, _)| *score)
        .map(|(_, device)| device)
        .ok_or(GpuError::NoSuitableDevice)
}

/// Score a physical device; negative scores are unusable.
unsafe fn score_physical_device(instance: &ash::Instance, device: vk::PhysicalDevice) -> i32 {
    let properties = unsafe { instance.get_physical_device_properties(device) };

    if !is_vulkan_1_3(properties.api_version) {
        return -1;
    }

    match properties.device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
        _ => 0,
    }
}

/// Whether an API version is at least 1.3.
pub fn is_vulkan_1_3(api_version: u32) -> bool {
    let major = vk::api_version_major(api_version);
    let minor = vk::api_version_minor(api_version);
    major > 1 || (major == 1 && minor >= 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_version_gate() {
        assert!(is_vulkan_1_3(vk::API_VERSION_1_3));
        assert!(is_vulkan_1_3(vk::make_api_version(0, 1, 4, 0)));
        assert!(!is_vulkan_1_3(vk::API_VERSION_1_2));
        assert!(!is_vulkan_1_3(vk::API_VERSION_1_0));
    }

    #[test]
    fn validation_layer_name() {
        assert_eq!(
            validation_layers()[0].to_str().ok(),
            Some("VK_LAYER_KHRONOS_validation")
        );
    }
}
