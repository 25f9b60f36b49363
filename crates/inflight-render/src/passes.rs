//! Compute and composite pipelines with their descriptor set layouts.

use ash::vk;
use inflight_gpu::{
    ComputePipeline, DescriptorSetLayoutBuilder, GraphicsPipeline, GraphicsPipelineConfig, Result,
};

/// Procedural texture pass: writes the intermediate storage image.
pub struct TexturePass {
    pub set_layout: vk::DescriptorSetLayout,
    pub pipeline: ComputePipeline,
}

impl TexturePass {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        let set_layout = unsafe {
            DescriptorSetLayoutBuilder::new()
                .storage_image(0, vk::ShaderStageFlags::COMPUTE)
                .uniform_buffer(1, vk::ShaderStageFlags::COMPUTE)
                .build(device)?
        };

        let pipeline = unsafe {
            ComputePipeline::new(device, inflight_shaders::texture_shader(), &[set_layout])
        };
        match pipeline {
            Ok(pipeline) => Ok(Self {
                set_layout,
                pipeline,
            }),
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                Err(e)
            }
        }
    }

    /// # Safety
    /// The device must be valid and the pass must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            self.pipeline.destroy(device);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}

/// Fullscreen composite pass: samples the intermediate and static textures
/// into the presentable image.
pub struct CompositePass {
    pub set_layout: vk::DescriptorSetLayout,
    pub pipeline: GraphicsPipeline,
    pub color_format: vk::Format,
}

impl CompositePass {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device, color_format: vk::Format) -> Result<Self> {
        let set_layout = unsafe {
            DescriptorSetLayoutBuilder::new()
                .sampled_image(0, vk::ShaderStageFlags::FRAGMENT)
                .sampled_image(1, vk::ShaderStageFlags::FRAGMENT)
                .uniform_buffer(2, vk::ShaderStageFlags::FRAGMENT)
                .build(device)?
        };

        match unsafe { Self::create_pipeline(device, set_layout, color_format) } {
            Ok(pipeline) => Ok(Self {
                set_layout,
                pipeline,
                color_format,
            }),
            Err(e) => {
                unsafe { device.destroy_descriptor_set_layout(set_layout, None) };
                Err(e)
            }
        }
    }

    unsafe fn create_pipeline(
        device: &ash::Device,
        set_layout: vk::DescriptorSetLayout,
        color_format: vk::Format,
    ) -> Result<GraphicsPipeline> {
        let config = GraphicsPipelineConfig {
            vertex_shader: inflight_shaders::toy_vertex_shader().to_vec(),
            fragment_shader: inflight_shaders::toy_fragment_shader().to_vec(),
            color_format,
            ..Default::default()
        };
        unsafe { GraphicsPipeline::new(device, &config, &[set_layout]) }
    }

    /// Rebuild the pipeline for a new attachment format. The descriptor set
    /// layout is kept.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn rebuild(&mut self, device: &ash::Device, color_format: vk::Format) -> Result<()> {
        let pipeline = unsafe { Self::create_pipeline(device, self.set_layout, color_format)? };
        unsafe { self.pipeline.destroy(device) };
        self.pipeline = pipeline;
        self.color_format = color_format;
        Ok(())
    }

    /// # Safety
    /// The device must be valid and the pass must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            self.pipeline.destroy(device);
            device.destroy_descriptor_set_layout(self.set_layout, None);
        }
    }
}
