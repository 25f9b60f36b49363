//! Pipeline creation and management.

use crate::error::{GpuError, Result};
use ash::vk;

unsafe fn create_shader_module(
    device: &ash::Device,
    code: &[u32],
    stage: &str,
) -> Result<vk::ShaderModule> {
    let info = vk::ShaderModuleCreateInfo::default().code(code);
    unsafe { device.create_shader_module(&info, None) }
        .map_err(|e| GpuError::PipelineCreation(format!("{stage} shader module: {e}")))
}

unsafe fn create_layout(
    device: &ash::Device,
    descriptor_set_layouts: &[vk::DescriptorSetLayout],
) -> Result<vk::PipelineLayout> {
    let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(descriptor_set_layouts);
    unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(|e| GpuError::PipelineCreation(e.to_string()))
}

/// Compute pipeline wrapper.
pub struct ComputePipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl ComputePipeline {
    /// Create a compute pipeline from SPIR-V.
    ///
    /// # Safety
    /// The device must be valid and the shader code must be valid SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        shader_code: &[u32],
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Self> {
        let shader_module = unsafe { create_shader_module(device, shader_code, "Compute")? };
        let layout = match unsafe { create_layout(device, descriptor_set_layouts) } {
            Ok(layout) => layout,
            Err(e) => {
                unsafe { device.destroy_shader_module(shader_module, None) };
                return Err(e);
            }
        };

        let stage_info = vk::PipelineShaderStageCreateInfo::default()
            .stage(vk::ShaderStageFlags::COMPUTE)
            .module(shader_module)
            .name(c"main");

        let pipeline_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage_info)
            .layout(layout);

        let result = unsafe {
            device.create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        };
        unsafe { device.destroy_shader_module(shader_module, None) };

        match result {
            Ok(pipelines) => Ok(Self {
                pipeline: pipelines[0],
                layout,
            }),
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(GpuError::PipelineCreation(e.to_string()))
            }
        }
    }

    /// Destroy the pipeline.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Graphics pipeline configuration.
///
/// Vertices are generated in the vertex shader, so there is no vertex input.
#[derive(Clone)]
pub struct GraphicsPipelineConfig {
    pub vertex_shader: Vec<u32>,
    pub fragment_shader: Vec<u32>,
    pub topology: vk::PrimitiveTopology,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub color_format: vk::Format,
}

impl Default for GraphicsPipelineConfig {
    fn default() -> Self {
        Self {
            vertex_shader: Vec::new(),
            fragment_shader: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::NONE,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            color_format: vk::Format::B8G8R8A8_SRGB,
        }
    }
}

/// Graphics pipeline wrapper.
pub struct GraphicsPipeline {
    pub pipeline: vk::Pipeline,
    pub layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Create a graphics pipeline using dynamic rendering (Vulkan 1.3).
    ///
    /// # Safety
    /// The device must be valid and shader code must be valid SPIR-V.
    pub unsafe fn new(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
    ) -> Result<Self> {
        let vert_module = unsafe { create_shader_module(device, &config.vertex_shader, "Vertex")? };
        let frag_module =
            match unsafe { create_shader_module(device, &config.fragment_shader, "Fragment") } {
                Ok(module) => module,
                Err(e) => {
                    unsafe { device.destroy_shader_module(vert_module, None) };
                    return Err(e);
                }
            };

        let result = unsafe {
            Self::build(device, config, descriptor_set_layouts, vert_module, frag_module)
        };

        unsafe {
            device.destroy_shader_module(vert_module, None);
            device.destroy_shader_module(frag_module, None);
        }

        result
    }

    unsafe fn build(
        device: &ash::Device,
        config: &GraphicsPipelineConfig,
        descriptor_set_layouts: &[vk::DescriptorSetLayout],
        vert_module: vk::ShaderModule,
        frag_module: vk::ShaderModule,
    ) -> Result<Self> {
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(vert_module)
                .name(c"main"),
            vk::PipelineShaderStageCreateInfo::default()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(frag_module)
                .name(c"main"),
        ];

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(config.topology)
            .primitive_restart_enable(false);

        // Viewport and scissor are dynamic
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = vk::PipelineRasterizationStateCreateInfo::default()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(config.cull_mode)
            .front_face(config.front_face)
            .depth_bias_enable(false)
            .line_width(1.0);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .sample_shading_enable(false);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::default()
            .blend_enable(false)
            .color_write_mask(vk::ColorComponentFlags::RGBA)];

        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let layout = unsafe { create_layout(device, descriptor_set_layouts)? };

        let color_formats = [config.color_format];
        let mut rendering_info =
            vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .push_next(&mut rendering_info);

        match unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info], None)
        } {
            Ok(pipelines) => Ok(Self {
                pipeline: pipelines[0],
                layout,
            }),
            Err((_, e)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                Err(GpuError::PipelineCreation(e.to_string()))
            }
        }
    }

    /// Destroy the pipeline.
    ///
    /// # Safety
    /// The device must be valid and the pipeline must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_pipeline(self.pipeline, None);
            device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
