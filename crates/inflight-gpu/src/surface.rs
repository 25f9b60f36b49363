//! Surface management for windowed rendering.
//!
//! Wraps the Vulkan surface and swapchain loaders, hiding the
//! raw-window-handle plumbing from the renderer.

use crate::context::GpuContext;
use crate::error::{GpuError, Result};
use crate::swapchain::{calculate_extent, select_present_mode, select_surface_format, Swapchain};
use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

/// Surface context for windowed rendering.
pub struct SurfaceContext {
    /// The Vulkan surface handle.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub surface_loader: ash::khr::surface::Instance,
    /// Swapchain extension loader.
    pub swapchain_loader: ash::khr::swapchain::Device,
}

impl SurfaceContext {
    /// Create a surface for a window.
    ///
    /// Fails if the context's queue cannot present to it.
    ///
    /// # Safety
    /// The GPU context must be valid and outlive the surface; the window must
    /// have valid handles.
    pub unsafe fn from_window<W>(gpu: &GpuContext, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = unsafe {
            ash_window::create_surface(
                gpu.entry(),
                gpu.instance(),
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let surface_loader = ash::khr::surface::Instance::new(gpu.entry(), gpu.instance());

        let supported = unsafe {
            surface_loader.get_physical_device_surface_support(
                gpu.physical_device(),
                gpu.queue_family(),
                surface,
            )
        };
        if !matches!(supported, Ok(true)) {
            unsafe { surface_loader.destroy_surface(surface, None) };
            return Err(GpuError::SurfaceCreation(
                "Queue family cannot present to this surface".to_string(),
            ));
        }

        let swapchain_loader = ash::khr::swapchain::Device::new(gpu.instance(), gpu.device());

        Ok(Self {
            surface,
            surface_loader,
            swapchain_loader,
        })
    }

    /// Query surface capabilities.
    pub fn capabilities(&self, gpu: &GpuContext) -> Result<SurfaceCapabilities> {
        unsafe {
            let caps = self
                .surface_loader
                .get_physical_device_surface_capabilities(gpu.physical_device(), self.surface)?;

            let formats = self
                .surface_loader
                .get_physical_device_surface_formats(gpu.physical_device(), self.surface)?;

            let present_modes = self
                .surface_loader
                .get_physical_device_surface_present_modes(gpu.physical_device(), self.surface)?;

            Ok(SurfaceCapabilities {
                capabilities: caps,
                formats,
                present_modes,
            })
        }
    }

    /// Create a swapchain for this surface.
    ///
    /// # Safety
    /// The GPU context must be valid; `old_swapchain` must not be in use.
    pub unsafe fn create_swapchain(
        &self,
        gpu: &GpuContext,
        width: u32,
        height: u32,
        vsync: bool,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Swapchain> {
        let caps = self.capabilities(gpu)?;

        let surface_format = select_surface_format(&caps.formats).ok_or_else(|| {
            GpuError::SwapchainCreation("Surface reports no formats".to_string())
        })?;
        let present_mode = select_present_mode(&caps.present_modes, vsync);
        let extent = calculate_extent(&caps.capabilities, width, height);

        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::SwapchainCreation(format!(
                "Surface extent is {}x{}",
                extent.width, extent.height
            )));
        }

        tracing::debug!(
            "Creating swapchain {}x{} ({:?}, {:?})",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode
        );

        unsafe {
            Swapchain::new(
                gpu.device(),
                &self.swapchain_loader,
                self.surface,
                &caps.capabilities,
                surface_format,
                present_mode,
                extent,
                old_swapchain,
            )
        }
    }

    /// Build a replacement swapchain, then destroy the old one.
    ///
    /// # Safety
    /// The old swapchain and its images must not be in use.
    pub unsafe fn recreate_swapchain(
        &self,
        gpu: &GpuContext,
        old_swapchain: &mut Swapchain,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Swapchain> {
        let created = unsafe {
            self.create_swapchain(gpu, width, height, vsync, Some(old_swapchain.swapchain))
        };
        unsafe { old_swapchain.destroy(gpu.device(), &self.swapchain_loader) };
        created
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// The surface must not be in use.
    pub unsafe fn destroy(&self) {
        unsafe { self.surface_loader.destroy_surface(self.surface, None) };
    }
}

/// Surface capabilities query result.
pub struct SurfaceCapabilities {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}
