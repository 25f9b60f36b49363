//! Swapchain management.

use crate::barrier::color_subresource_range;
use crate::error::{GpuError, Result};
use crate::sync::create_semaphore;
use ash::vk;

/// Result of acquiring a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquiredImage {
    /// An image was acquired; `suboptimal` means it no longer matches the
    /// surface exactly but can still be presented.
    Ready { index: u32, suboptimal: bool },
    /// The swapchain must be recreated before acquiring again.
    OutOfDate,
    /// No image became available within the timeout.
    NotReady,
}

/// Result of presenting a swapchain image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentResult {
    Presented,
    Suboptimal,
    OutOfDate,
}

/// Swapchain wrapper.
///
/// Owns one render-finished semaphore per image: presentation of an image
/// waits on that image's semaphore, so reuse is ordered by the
/// presentation engine handing the image back.
pub struct Swapchain {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub image_views: Vec<vk::ImageView>,
    pub render_finished: Vec<vk::Semaphore>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Create a new swapchain.
    ///
    /// # Safety
    /// All handles must be valid. `old_swapchain` must not be in use.
    #[allow(clippy::too_many_arguments)]
    pub unsafe fn new(
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
        surface: vk::SurfaceKHR,
        surface_capabilities: &vk::SurfaceCapabilitiesKHR,
        surface_format: vk::SurfaceFormatKHR,
        present_mode: vk::PresentModeKHR,
        extent: vk::Extent2D,
        old_swapchain: Option<vk::SwapchainKHR>,
    ) -> Result<Self> {
        let mut image_count = surface_capabilities.min_image_count + 1;
        if surface_capabilities.max_image_count > 0
            && image_count > surface_capabilities.max_image_count
        {
            image_count = surface_capabilities.max_image_count;
        }

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(surface_capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true)
            .old_swapchain(old_swapchain.unwrap_or(vk::SwapchainKHR::null()));

        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        let mut this = Self {
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            render_finished: Vec::new(),
            format: surface_format.format,
            extent,
            present_mode,
        };

        // Partially built state is released on failure
        if let Err(e) = unsafe { this.create_image_resources(device, swapchain_loader) } {
            unsafe { this.destroy(device, swapchain_loader) };
            return Err(e);
        }

        Ok(this)
    }

    unsafe fn create_image_resources(
        &mut self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) -> Result<()> {
        self.images = unsafe { swapchain_loader.get_swapchain_images(self.swapchain)? };

        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(self.format)
                .components(vk::ComponentMapping::default())
                .subresource_range(color_subresource_range());

            self.image_views
                .push(unsafe { device.create_image_view(&view_info, None)? });
            self.render_finished
                .push(unsafe { create_semaphore(device)? });
        }

        Ok(())
    }

    /// Number of presentable images.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Acquire the next image, signalling `semaphore` when it is writable.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn acquire_next_image(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        semaphore: vk::Semaphore,
        timeout_ns: u64,
    ) -> Result<AcquiredImage> {
        let result = unsafe {
            swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout_ns,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            Ok((index, suboptimal)) => Ok(AcquiredImage::Ready { index, suboptimal }),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquiredImage::OutOfDate),
            Err(vk::Result::TIMEOUT | vk::Result::NOT_READY) => Ok(AcquiredImage::NotReady),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present an image after `wait_semaphore` is signaled.
    ///
    /// # Safety
    /// All handles must be valid.
    pub unsafe fn present(
        &self,
        swapchain_loader: &ash::khr::swapchain::Device,
        queue: vk::Queue,
        image_index: u32,
        wait_semaphore: vk::Semaphore,
    ) -> Result<PresentResult> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [wait_semaphore];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        match unsafe { swapchain_loader.queue_present(queue, &present_info) } {
            Ok(false) => Ok(PresentResult::Presented),
            Ok(true) => Ok(PresentResult::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentResult::OutOfDate),
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Destroy the swapchain.
    ///
    /// # Safety
    /// All handles must be valid and swapchain must not be in use.
    pub unsafe fn destroy(
        &mut self,
        device: &ash::Device,
        swapchain_loader: &ash::khr::swapchain::Device,
    ) {
        unsafe {
            for semaphore in self.render_finished.drain(..) {
                device.destroy_semaphore(semaphore, None);
            }
            for view in self.image_views.drain(..) {
                device.destroy_image_view(view, None);
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
        self.swapchain = vk::SwapchainKHR::null();
        self.images.clear();
    }
}

/// Select the surface format, preferring 8-bit BGRA sRGB.
pub fn select_surface_format(available: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|format| {
            format.format == vk::Format::B8G8R8A8_SRGB
                && format.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| available.first())
        .copied()
}

/// Select the present mode.
///
/// With vsync, FIFO. Without, mailbox, then immediate, then FIFO (always
/// supported).
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Calculate swapchain extent.
///
/// Uses the surface's current extent when it dictates one, otherwise clamps
/// the desired size into the supported range.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}
