//! Image layout transitions via synchronization2.

use ash::vk;

/// Full color subresource of a single-mip, single-layer image.
pub fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

/// One image layout transition with its execution and memory dependency.
#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    pub image: vk::Image,
    pub old_layout: vk::ImageLayout,
    pub new_layout: vk::ImageLayout,
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

impl ImageBarrier {
    fn to_vk(self) -> vk::ImageMemoryBarrier2<'static> {
        vk::ImageMemoryBarrier2::default()
            .src_stage_mask(self.src_stage)
            .src_access_mask(self.src_access)
            .dst_stage_mask(self.dst_stage)
            .dst_access_mask(self.dst_access)
            .old_layout(self.old_layout)
            .new_layout(self.new_layout)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .image(self.image)
            .subresource_range(color_subresource_range())
    }
}

/// Record a batch of image barriers.
///
/// # Safety
/// The device and command buffer must be valid and recording.
pub unsafe fn image_barrier(device: &ash::Device, cmd: vk::CommandBuffer, barriers: &[ImageBarrier]) {
    if barriers.is_empty() {
        return;
    }
    let barriers: Vec<_> = barriers.iter().map(|b| b.to_vk()).collect();
    let dependency_info = vk::DependencyInfo::default().image_memory_barriers(&barriers);
    unsafe { device.cmd_pipeline_barrier2(cmd, &dependency_info) };
}
