//! Sampler creation.

use crate::error::Result;
use ash::vk;

/// Create a linear sampler with the given address mode on all axes.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_sampler(
    device: &ash::Device,
    address_mode: vk::SamplerAddressMode,
) -> Result<vk::Sampler> {
    let create_info = vk::SamplerCreateInfo::default()
        .mag_filter(vk::Filter::LINEAR)
        .min_filter(vk::Filter::LINEAR)
        .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
        .address_mode_u(address_mode)
        .address_mode_v(address_mode)
        .address_mode_w(address_mode)
        .max_lod(vk::LOD_CLAMP_NONE);

    let sampler = unsafe { device.create_sampler(&create_info, None)? };
    Ok(sampler)
}
