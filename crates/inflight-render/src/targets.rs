//! Images sampled by the composite pass.

use ash::vk;
use gpu_allocator::MemoryLocation;
use inflight_core::{Resolution, TextureData};
use inflight_gpu::{
    execute_single_time_commands, image_barrier, CommandPool, GpuContext, GpuImage, ImageBarrier,
    Result,
};

/// Format of the compute pass output.
pub const INTERMEDIATE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Format of the static texture. Texels are sampled as stored, without
/// sRGB decoding.
pub const STATIC_TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

fn image_info(
    resolution: Resolution,
    format: vk::Format,
    usage: vk::ImageUsageFlags,
) -> vk::ImageCreateInfo<'static> {
    vk::ImageCreateInfo::default()
        .image_type(vk::ImageType::TYPE_2D)
        .format(format)
        .extent(vk::Extent3D {
            width: resolution.width,
            height: resolution.height,
            depth: 1,
        })
        .mip_levels(1)
        .array_layers(1)
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::UNDEFINED)
}

/// Allocate the storage image the compute pass writes, sized to the
/// presentable images.
pub fn create_intermediate(gpu: &GpuContext, resolution: Resolution) -> Result<GpuImage> {
    let info = image_info(
        resolution,
        INTERMEDIATE_FORMAT,
        vk::ImageUsageFlags::STORAGE
            | vk::ImageUsageFlags::SAMPLED
            | vk::ImageUsageFlags::TRANSFER_SRC,
    );
    gpu.allocator()
        .lock()
        .create_image(&info, MemoryLocation::GpuOnly, "intermediate")
}

/// Upload `texture` into a sampled image left in the shader read-only layout.
///
/// Blocks until the copy completes.
pub fn upload_static_texture(
    gpu: &GpuContext,
    pool: &CommandPool,
    texture: &TextureData,
) -> Result<GpuImage> {
    let mut staging = gpu.allocator().lock().create_buffer(
        texture.byte_len(),
        vk::BufferUsageFlags::TRANSFER_SRC,
        MemoryLocation::CpuToGpu,
        "static texture staging",
    )?;

    let uploaded = staging
        .write_bytes(0, texture.pixels())
        .and_then(|()| copy_to_image(gpu, pool, staging.buffer, texture));

    gpu.allocator().lock().free_buffer(&mut staging)?;
    uploaded
}

fn copy_to_image(
    gpu: &GpuContext,
    pool: &CommandPool,
    staging: vk::Buffer,
    texture: &TextureData,
) -> Result<GpuImage> {
    let info = image_info(
        texture.resolution(),
        STATIC_TEXTURE_FORMAT,
        vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
    );
    let mut image = gpu
        .allocator()
        .lock()
        .create_image(&info, MemoryLocation::GpuOnly, "static texture")?;

    let device = gpu.device();
    let target = image.image;
    let region = vk::BufferImageCopy::default()
        .image_subresource(vk::ImageSubresourceLayers {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            mip_level: 0,
            base_array_layer: 0,
            layer_count: 1,
        })
        .image_extent(image.extent);

    let copied = unsafe {
        execute_single_time_commands(device, pool, gpu.queue(), |cmd| {
            image_barrier(
                device,
                cmd,
                &[ImageBarrier {
                    image: target,
                    old_layout: vk::ImageLayout::UNDEFINED,
                    new_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    src_stage: vk::PipelineStageFlags2::TOP_OF_PIPE,
                    src_access: vk::AccessFlags2::NONE,
                    dst_stage: vk::PipelineStageFlags2::TRANSFER,
                    dst_access: vk::AccessFlags2::TRANSFER_WRITE,
                }],
            );
            device.cmd_copy_buffer_to_image(
                cmd,
                staging,
                target,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[region],
            );
            image_barrier(
                device,
                cmd,
                &[ImageBarrier {
                    image: target,
                    old_layout: vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    new_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    src_stage: vk::PipelineStageFlags2::TRANSFER,
                    src_access: vk::AccessFlags2::TRANSFER_WRITE,
                    dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
                    dst_access: vk::AccessFlags2::SHADER_SAMPLED_READ,
                }],
            );
        })
    };

    if let Err(e) = copied {
        gpu.allocator().lock().free_image(&mut image)?;
        return Err(e);
    }
    Ok(image)
}
