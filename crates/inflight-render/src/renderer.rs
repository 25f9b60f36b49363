//! Vulkan implementation of the frame backend.

use std::time::Duration;

use ash::vk;
use inflight_core::{FrameParams, PresentConfig, Resolution, TextureData};
use inflight_frame::recorder::Binding;
use inflight_frame::{
    AcquireOutcome, AcquiredSlot, BoundResource, CompletionSignals, DescriptorBindings,
    FrameBackend, FrameCommand, FrameError, FramePlan, FrameResult, ImageTarget, PresentOutcome,
    PresentationBackend, SamplerKind, SignalStatus, SwapchainImage, Transition,
};
use inflight_gpu::{
    begin_command_buffer, create_sampler, end_command_buffer, image_barrier, reset_fence,
    submit_command_buffer, wait_for_fence, write_combined_image_sampler, write_storage_image,
    write_uniform_buffer, AcquiredImage, CommandPool, FenceStatus, GpuContext, GpuImage,
    ImageBarrier, PresentResult, SurfaceContext, Swapchain,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use scopeguard::{guard, ScopeGuard};

use crate::error::{RenderError, Result};
use crate::passes::{CompositePass, TexturePass};
use crate::slot::SlotResources;
use crate::targets::{create_intermediate, upload_static_texture};
use crate::translate;

/// How long image acquisition may block before the frame is skipped.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(1);

/// Color the presentable image is cleared to before compositing.
const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

/// Renderer construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub present: PresentConfig,
    pub frames_in_flight: usize,
}

/// Owns every Vulkan object needed to draw a frame.
///
/// Dropping the renderer waits for the device to go idle before anything is
/// released. The window the surface was created from must outlive it.
pub struct Renderer {
    surface: SurfaceContext,
    swapchain: Swapchain,
    command_pool: CommandPool,
    slots: Vec<SlotResources>,
    texture_pass: TexturePass,
    composite_pass: CompositePass,
    intermediate: GpuImage,
    static_texture: GpuImage,
    clamp_sampler: vk::Sampler,
    repeat_sampler: vk::Sampler,
    /// The last acquire reported a suboptimal swapchain.
    stale: bool,
    // Dropped last
    gpu: GpuContext,
}

impl Renderer {
    /// Create the renderer for a window.
    pub fn new<W>(
        gpu: GpuContext,
        window: &W,
        config: RendererConfig,
        texture: &TextureData,
    ) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let slot_count = u32::try_from(config.frames_in_flight).map_err(|_| {
            RenderError::InvalidConfig(format!(
                "Unsupported frames in flight: {}",
                config.frames_in_flight
            ))
        })?;
        let device = gpu.device();
        let resolution = config.present.resolution;

        // Each guard releases its object if a later step fails.
        let surface = guard(
            unsafe { SurfaceContext::from_window(&gpu, window)? },
            |surface| unsafe { surface.destroy() },
        );
        let swapchain = guard(
            unsafe {
                surface.create_swapchain(
                    &gpu,
                    resolution.width,
                    resolution.height,
                    config.present.vsync,
                    None,
                )?
            },
            |mut swapchain| unsafe { swapchain.destroy(device, &surface.swapchain_loader) },
        );

        let command_pool = guard(
            unsafe {
                CommandPool::new(
                    device,
                    gpu.queue_family(),
                    vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER,
                )?
            },
            |pool| unsafe { pool.destroy(device) },
        );
        let command_buffers = unsafe { command_pool.allocate_command_buffers(device, slot_count)? };
        let mut slots = guard(
            Vec::with_capacity(command_buffers.len()),
            |mut slots: Vec<SlotResources>| {
                for slot in &mut slots {
                    unsafe { slot.destroy(&gpu) };
                }
            },
        );
        for (index, cmd) in command_buffers.into_iter().enumerate() {
            slots.push(unsafe { SlotResources::new(&gpu, index, cmd)? });
        }

        let texture_pass = guard(unsafe { TexturePass::new(device)? }, |pass| unsafe {
            pass.destroy(device);
        });
        let composite_pass = guard(
            unsafe { CompositePass::new(device, swapchain.format)? },
            |pass| unsafe { pass.destroy(device) },
        );

        let extent = Resolution::new(swapchain.extent.width, swapchain.extent.height);
        let intermediate = guard(create_intermediate(&gpu, extent)?, |mut image| {
            release_image(&gpu, &mut image);
        });
        let static_texture = guard(
            upload_static_texture(&gpu, &command_pool, texture)?,
            |mut image| release_image(&gpu, &mut image),
        );

        let clamp_sampler = guard(
            unsafe { create_sampler(device, translate::address_mode(SamplerKind::Clamp))? },
            |sampler| unsafe { device.destroy_sampler(sampler, None) },
        );
        let repeat_sampler = guard(
            unsafe { create_sampler(device, translate::address_mode(SamplerKind::Repeat))? },
            |sampler| unsafe { device.destroy_sampler(sampler, None) },
        );

        // Startup succeeded; hand everything to the renderer, newest first.
        let repeat_sampler = ScopeGuard::into_inner(repeat_sampler);
        let clamp_sampler = ScopeGuard::into_inner(clamp_sampler);
        let static_texture = ScopeGuard::into_inner(static_texture);
        let intermediate = ScopeGuard::into_inner(intermediate);
        let composite_pass = ScopeGuard::into_inner(composite_pass);
        let texture_pass = ScopeGuard::into_inner(texture_pass);
        let slots = ScopeGuard::into_inner(slots);
        let command_pool = ScopeGuard::into_inner(command_pool);
        let swapchain = ScopeGuard::into_inner(swapchain);
        let surface = ScopeGuard::into_inner(surface);

        tracing::info!(
            "Renderer ready: {extent}, {} swapchain images, {} frames in flight, {:?}",
            swapchain.image_count(),
            slots.len(),
            swapchain.present_mode
        );

        Ok(Self {
            surface,
            swapchain,
            command_pool,
            slots,
            texture_pass,
            composite_pass,
            intermediate,
            static_texture,
            clamp_sampler,
            repeat_sampler,
            stale: false,
            gpu,
        })
    }

    /// Extent of the current swapchain.
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.swapchain.extent.width, self.swapchain.extent.height)
    }

    /// Get the GPU context.
    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    fn slot(&self, index: usize) -> Result<&SlotResources> {
        self.slots.get(index).ok_or(RenderError::UnknownIndex {
            kind: "slot",
            index,
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut SlotResources> {
        self.slots.get_mut(index).ok_or(RenderError::UnknownIndex {
            kind: "slot",
            index,
        })
    }

    fn image_for(
        &self,
        target: ImageTarget,
        presentable: &SwapchainImage,
    ) -> Result<(vk::Image, vk::ImageView)> {
        match target {
            ImageTarget::Presentable => {
                let index = presentable.index() as usize;
                self.swapchain
                    .images
                    .get(index)
                    .zip(self.swapchain.image_views.get(index))
                    .map(|(&image, &view)| (image, view))
                    .ok_or(RenderError::UnknownIndex {
                        kind: "swapchain image",
                        index,
                    })
            }
            ImageTarget::Intermediate => Ok((self.intermediate.image, self.intermediate.view)),
            ImageTarget::StaticTexture => Ok((self.static_texture.image, self.static_texture.view)),
        }
    }

    fn sampler(&self, kind: SamplerKind) -> vk::Sampler {
        match kind {
            SamplerKind::Clamp => self.clamp_sampler,
            SamplerKind::Repeat => self.repeat_sampler,
        }
    }

    fn render_finished(&self, image: &SwapchainImage) -> Result<vk::Semaphore> {
        let index = image.index() as usize;
        self.swapchain
            .render_finished
            .get(index)
            .copied()
            .ok_or(RenderError::UnknownIndex {
                kind: "swapchain image",
                index,
            })
    }

    fn cmd_transition(
        &self,
        cmd: vk::CommandBuffer,
        transition: &Transition,
        presentable: &SwapchainImage,
    ) -> Result<()> {
        let (image, _) = self.image_for(transition.target, presentable)?;
        let (src_stage, src_access) = translate::src_scope(transition.src);
        let (dst_stage, dst_access) = translate::dst_scope(transition.dst);
        let barrier = ImageBarrier {
            image,
            old_layout: translate::layout(transition.old_layout),
            new_layout: translate::layout(transition.new_layout),
            src_stage,
            src_access,
            dst_stage,
            dst_access,
        };
        unsafe { image_barrier(self.gpu.device(), cmd, &[barrier]) };
        Ok(())
    }

    fn allocate_set(
        &self,
        slot: &SlotResources,
        layout: vk::DescriptorSetLayout,
        bindings: &DescriptorBindings,
        presentable: &SwapchainImage,
    ) -> Result<vk::DescriptorSet> {
        let device = self.gpu.device();
        let set = unsafe { slot.descriptors.allocate(device, layout)? };
        for &Binding { binding, resource } in bindings.bindings() {
            match resource {
                BoundResource::StorageImage { image, layout } => {
                    let (_, view) = self.image_for(image, presentable)?;
                    unsafe {
                        write_storage_image(device, set, binding, view, translate::layout(layout));
                    }
                }
                BoundResource::SampledImage {
                    image,
                    layout,
                    sampler,
                } => {
                    let (_, view) = self.image_for(image, presentable)?;
                    unsafe {
                        write_combined_image_sampler(
                            device,
                            set,
                            binding,
                            view,
                            translate::layout(layout),
                            self.sampler(sampler),
                        );
                    }
                }
                BoundResource::UniformBuffer { slot } => {
                    let buffer = self.slot(slot)?.params.buffer;
                    unsafe { write_uniform_buffer(device, set, binding, buffer, FrameParams::SIZE) };
                }
            }
        }
        Ok(set)
    }

    fn cmd_begin_rendering(
        &self,
        cmd: vk::CommandBuffer,
        area: Resolution,
        transition: &Transition,
        presentable: &SwapchainImage,
    ) -> Result<()> {
        self.cmd_transition(cmd, transition, presentable)?;
        let (_, view) = self.image_for(transition.target, presentable)?;

        let color_attachment = vk::RenderingAttachmentInfo::default()
            .image_view(view)
            .image_layout(translate::layout(transition.new_layout))
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .clear_value(vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: CLEAR_COLOR,
                },
            });

        let render_area = vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: vk::Extent2D {
                width: area.width,
                height: area.height,
            },
        };
        let rendering_info = vk::RenderingInfo::default()
            .render_area(render_area)
            .layer_count(1)
            .color_attachments(std::slice::from_ref(&color_attachment));

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: area.width as f32,
            height: area.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        let device = self.gpu.device();
        unsafe {
            device.cmd_begin_rendering(cmd, &rendering_info);
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[render_area]);
        }
        Ok(())
    }

    fn record_plan(&self, slot_index: usize, image: &SwapchainImage, plan: &FramePlan) -> Result<()> {
        let device = self.gpu.device();
        let slot = self.slot(slot_index)?;
        let cmd = slot.command_buffer;

        unsafe {
            slot.descriptors.reset(device)?;
            begin_command_buffer(device, cmd, vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)?;
        }

        for command in plan.commands() {
            match command {
                FrameCommand::Transition(transition) => {
                    self.cmd_transition(cmd, transition, image)?;
                }
                FrameCommand::BindCompute(bindings) => {
                    let pipeline = &self.texture_pass.pipeline;
                    let set =
                        self.allocate_set(slot, self.texture_pass.set_layout, bindings, image)?;
                    unsafe {
                        device.cmd_bind_pipeline(
                            cmd,
                            vk::PipelineBindPoint::COMPUTE,
                            pipeline.pipeline,
                        );
                        device.cmd_bind_descriptor_sets(
                            cmd,
                            vk::PipelineBindPoint::COMPUTE,
                            pipeline.layout,
                            0,
                            &[set],
                            &[],
                        );
                    }
                }
                FrameCommand::Dispatch { groups } => unsafe {
                    device.cmd_dispatch(cmd, groups[0], groups[1], groups[2]);
                },
                FrameCommand::BeginRendering { area, transition } => {
                    self.cmd_begin_rendering(cmd, *area, transition, image)?;
                }
                FrameCommand::BindGraphics(bindings) => {
                    let pipeline = &self.composite_pass.pipeline;
                    let set =
                        self.allocate_set(slot, self.composite_pass.set_layout, bindings, image)?;
                    unsafe {
                        device.cmd_bind_pipeline(
                            cmd,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.pipeline,
                        );
                        device.cmd_bind_descriptor_sets(
                            cmd,
                            vk::PipelineBindPoint::GRAPHICS,
                            pipeline.layout,
                            0,
                            &[set],
                            &[],
                        );
                    }
                }
                FrameCommand::Draw {
                    vertex_count,
                    instance_count,
                } => unsafe {
                    device.cmd_draw(cmd, *vertex_count, *instance_count, 0, 0);
                },
                FrameCommand::EndRendering => unsafe { device.cmd_end_rendering(cmd) },
            }
        }

        unsafe { end_command_buffer(device, cmd)? };
        Ok(())
    }

    fn submit_slot(&self, slot_index: usize, image: &SwapchainImage) -> Result<()> {
        let slot = self.slot(slot_index)?;
        let render_finished = self.render_finished(image)?;
        // The presentable image is first touched by a transfer-stage barrier
        let wait_stage =
            vk::PipelineStageFlags2::TRANSFER | vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
        unsafe {
            submit_command_buffer(
                self.gpu.device(),
                self.gpu.queue(),
                slot.command_buffer,
                (slot.sync.image_available, wait_stage),
                render_finished,
                slot.sync.in_flight,
            )?;
        }
        Ok(())
    }

    fn acquire_image(&mut self, slot_index: usize) -> Result<AcquireOutcome> {
        let semaphore = self.slot(slot_index)?.sync.image_available;
        let timeout_ns = u64::try_from(ACQUIRE_TIMEOUT.as_nanos()).unwrap_or(u64::MAX);
        let acquired = unsafe {
            self.swapchain
                .acquire_next_image(&self.surface.swapchain_loader, semaphore, timeout_ns)?
        };

        Ok(match acquired {
            AcquiredImage::Ready { index, suboptimal } => {
                if suboptimal && !self.stale {
                    tracing::debug!("Acquired image {index} from a suboptimal swapchain");
                }
                self.stale |= suboptimal;
                AcquireOutcome::Acquired(SwapchainImage::new(index, self.resolution()))
            }
            AcquiredImage::OutOfDate => AcquireOutcome::OutOfDate,
            AcquiredImage::NotReady => AcquireOutcome::NotReady,
        })
    }

    fn present_image(&self, image: &SwapchainImage) -> Result<PresentOutcome> {
        let wait = self.render_finished(image)?;
        let result = unsafe {
            self.swapchain.present(
                &self.surface.swapchain_loader,
                self.gpu.queue(),
                image.index(),
                wait,
            )?
        };

        Ok(match result {
            PresentResult::Presented if !self.stale => PresentOutcome::Presented,
            PresentResult::Presented | PresentResult::Suboptimal | PresentResult::OutOfDate => {
                PresentOutcome::OutOfDate
            }
        })
    }

    /// The caller idles the device first; the frame driver does so before
    /// every recreation.
    fn rebuild_swapchain(&mut self, desired: PresentConfig) -> Result<Resolution> {
        let swapchain = unsafe {
            self.surface.recreate_swapchain(
                &self.gpu,
                &mut self.swapchain,
                desired.resolution.width,
                desired.resolution.height,
                desired.vsync,
            )?
        };
        self.swapchain = swapchain;
        self.stale = false;

        if self.swapchain.format != self.composite_pass.color_format {
            tracing::debug!(
                "Swapchain format changed to {:?}, rebuilding composite pipeline",
                self.swapchain.format
            );
            unsafe {
                self.composite_pass
                    .rebuild(self.gpu.device(), self.swapchain.format)?;
            }
        }

        let resolution = self.resolution();
        let current = self.intermediate.extent;
        if current.width != resolution.width || current.height != resolution.height {
            self.gpu
                .allocator()
                .lock()
                .free_image(&mut self.intermediate)?;
            self.intermediate = create_intermediate(&self.gpu, resolution)?;
        }

        tracing::debug!(
            "Swapchain rebuilt at {resolution} ({} images)",
            self.swapchain.image_count()
        );
        Ok(resolution)
    }
}

fn release_image(gpu: &GpuContext, image: &mut GpuImage) {
    if let Err(e) = gpu.allocator().lock().free_image(image) {
        tracing::warn!("Failed to free image: {e}");
    }
}

impl CompletionSignals for Renderer {
    fn wait(&mut self, slot: usize, timeout: Duration) -> FrameResult<SignalStatus> {
        let fence = self.slot(slot)?.sync.in_flight;
        let status = unsafe { wait_for_fence(self.gpu.device(), fence, timeout) }
            .map_err(RenderError::from)?;
        Ok(match status {
            FenceStatus::Signaled => SignalStatus::Signaled,
            FenceStatus::TimedOut => SignalStatus::TimedOut,
        })
    }

    fn reset(&mut self, slot: usize) -> FrameResult<()> {
        let fence = self.slot(slot)?.sync.in_flight;
        unsafe { reset_fence(self.gpu.device(), fence) }.map_err(RenderError::from)?;
        Ok(())
    }
}

impl PresentationBackend for Renderer {
    fn acquire(&mut self, slot: &AcquiredSlot<'_>) -> FrameResult<AcquireOutcome> {
        Ok(self.acquire_image(slot.index())?)
    }

    fn present(
        &mut self,
        _slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
    ) -> FrameResult<PresentOutcome> {
        Ok(self.present_image(image)?)
    }

    fn recreate(&mut self, desired: PresentConfig) -> FrameResult<Resolution> {
        Ok(self.rebuild_swapchain(desired)?)
    }
}

impl FrameBackend for Renderer {
    fn write_params(&mut self, slot: &AcquiredSlot<'_>, params: &FrameParams) -> FrameResult<()> {
        let slot = self.slot_mut(slot.index())?;
        slot.params
            .write(std::slice::from_ref(params))
            .map_err(RenderError::from)?;
        Ok(())
    }

    fn record(
        &mut self,
        slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
        plan: &FramePlan,
    ) -> FrameResult<()> {
        Ok(self.record_plan(slot.index(), image, plan)?)
    }

    fn submit(&mut self, slot: &AcquiredSlot<'_>, image: &SwapchainImage) -> FrameResult<()> {
        Ok(self.submit_slot(slot.index(), image)?)
    }

    fn wait_idle(&mut self) -> FrameResult<()> {
        self.gpu
            .wait_idle()
            .map_err(|e| FrameError::from(RenderError::from(e)))
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        if let Err(e) = self.gpu.wait_idle() {
            tracing::warn!("Failed to wait for device idle during shutdown: {e}");
        }

        let device = self.gpu.device();
        unsafe {
            for slot in &mut self.slots {
                slot.destroy(&self.gpu);
            }
            self.texture_pass.destroy(device);
            self.composite_pass.destroy(device);
            device.destroy_sampler(self.clamp_sampler, None);
            device.destroy_sampler(self.repeat_sampler, None);
        }

        release_image(&self.gpu, &mut self.intermediate);
        release_image(&self.gpu, &mut self.static_texture);

        unsafe {
            self.command_pool.destroy(device);
            self.swapchain
                .destroy(device, &self.surface.swapchain_loader);
            self.surface.destroy();
        }

        tracing::debug!("Renderer destroyed");
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use scopeguard::{guard, ScopeGuard};

    /// Startup shaped like `Renderer::new`: every created object is guarded
    /// until the steps after it succeed.
    fn start(
        steps: &[&'static str],
        index: usize,
        fail_at: Option<usize>,
        released: &RefCell<Vec<&'static str>>,
    ) -> Result<Vec<&'static str>, usize> {
        let Some((&name, rest)) = steps.split_first() else {
            return Ok(Vec::new());
        };
        if fail_at == Some(index) {
            return Err(index);
        }
        let created = guard(name, |name| released.borrow_mut().push(name));
        let mut kept = start(rest, index + 1, fail_at, released)?;
        kept.insert(0, ScopeGuard::into_inner(created));
        Ok(kept)
    }

    const STEPS: [&str; 5] = ["surface", "swapchain", "command pool", "slots", "samplers"];

    #[test]
    fn failed_startup_releases_created_objects_newest_first() {
        let released = RefCell::new(Vec::new());
        assert_eq!(start(&STEPS, 0, Some(3), &released), Err(3));
        assert_eq!(*released.borrow(), ["command pool", "swapchain", "surface"]);
    }

    #[test]
    fn failure_on_first_step_releases_nothing() {
        let released = RefCell::new(Vec::new());
        assert_eq!(start(&STEPS, 0, Some(0), &released), Err(0));
        assert!(released.borrow().is_empty());
    }

    #[test]
    fn completed_startup_keeps_everything() {
        let released = RefCell::new(Vec::new());
        let kept = start(&STEPS, 0, None, &released).unwrap();
        assert!(released.borrow().is_empty());
        assert_eq!(kept, STEPS);
    }
}
