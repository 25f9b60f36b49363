//! Mapping of frame plan vocabulary onto Vulkan.

use ash::vk;
use inflight_frame::{Access, ImageLayout, SamplerKind};

pub fn layout(layout: ImageLayout) -> vk::ImageLayout {
    match layout {
        ImageLayout::Undefined => vk::ImageLayout::UNDEFINED,
        ImageLayout::General => vk::ImageLayout::GENERAL,
        ImageLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        ImageLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        ImageLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        ImageLayout::PresentSrc => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

/// Stage and access on the source side of a barrier.
pub fn src_scope(access: Access) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    match access {
        // Must cover the stage the image-available semaphore is waited at.
        Access::None => (vk::PipelineStageFlags2::ALL_COMMANDS, vk::AccessFlags2::NONE),
        other => scope(other),
    }
}

/// Stage and access on the destination side of a barrier.
pub fn dst_scope(access: Access) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    match access {
        Access::None => (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE),
        other => scope(other),
    }
}

fn scope(access: Access) -> (vk::PipelineStageFlags2, vk::AccessFlags2) {
    match access {
        Access::None => (vk::PipelineStageFlags2::NONE, vk::AccessFlags2::NONE),
        Access::TransferWrite => (
            vk::PipelineStageFlags2::TRANSFER,
            vk::AccessFlags2::TRANSFER_WRITE,
        ),
        Access::ComputeWrite => (
            vk::PipelineStageFlags2::COMPUTE_SHADER,
            vk::AccessFlags2::SHADER_STORAGE_WRITE,
        ),
        Access::FragmentSampledRead => (
            vk::PipelineStageFlags2::FRAGMENT_SHADER,
            vk::AccessFlags2::SHADER_SAMPLED_READ,
        ),
        Access::ColorAttachmentWrite => (
            vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        ),
    }
}

pub fn address_mode(sampler: SamplerKind) -> vk::SamplerAddressMode {
    match sampler {
        SamplerKind::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        SamplerKind::Repeat => vk::SamplerAddressMode::REPEAT,
    }
}
