//! Per-frame command plans.
//!
//! The recorder produces a backend-neutral list of commands for one frame:
//! layout transitions, the compute dispatch that fills the intermediate image,
//! and the fullscreen draw that composites it into the presentable image.
//! Descriptor bindings are rebuilt from the acquired slot every frame, so the
//! uniform binding can never refer to another slot's buffer.

use inflight_core::{FrameParams, Resolution};

use crate::ring::AcquiredSlot;
use crate::swapchain::SwapchainImage;

/// Image layouts used by the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    TransferDst,
    ShaderReadOnly,
    ColorAttachment,
    PresentSrc,
}

/// Images touched by the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageTarget {
    /// The acquired swapchain image.
    Presentable,
    /// Storage image written by compute and sampled by the composite pass.
    Intermediate,
    /// Texture uploaded at startup.
    StaticTexture,
}

/// Pipeline stage and access pair on one side of a barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    None,
    TransferWrite,
    ComputeWrite,
    FragmentSampledRead,
    ColorAttachmentWrite,
}

/// An image layout transition with its execution and memory dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub target: ImageTarget,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    pub src: Access,
    pub dst: Access,
}

/// Sampler used for a sampled image binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplerKind {
    /// Clamp-to-edge, for the intermediate image.
    Clamp,
    /// Repeat, for the static texture.
    Repeat,
}

/// Resource bound at a descriptor binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundResource {
    StorageImage {
        image: ImageTarget,
        layout: ImageLayout,
    },
    SampledImage {
        image: ImageTarget,
        layout: ImageLayout,
        sampler: SamplerKind,
    },
    /// The frame parameters buffer of a slot.
    UniformBuffer { slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub binding: u32,
    pub resource: BoundResource,
}

/// Descriptor bindings of one pipeline for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescriptorBindings {
    bindings: Vec<Binding>,
}

impl DescriptorBindings {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, binding: u32, resource: BoundResource) -> Self {
        self.bindings.push(Binding { binding, resource });
        self
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Slots whose uniform buffers are referenced.
    pub fn uniform_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bindings.iter().filter_map(|b| match b.resource {
            BoundResource::UniformBuffer { slot } => Some(slot),
            _ => None,
        })
    }
}

/// One step of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameCommand {
    Transition(Transition),
    BindCompute(DescriptorBindings),
    Dispatch { groups: [u32; 3] },
    /// Begin rendering into the presentable image, transitioning it to the
    /// color attachment layout first. Contents are cleared.
    BeginRendering {
        area: Resolution,
        transition: Transition,
    },
    BindGraphics(DescriptorBindings),
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },
    EndRendering,
}

/// Ordered commands for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    slot: usize,
    image_index: u32,
    commands: Vec<FrameCommand>,
}

impl FramePlan {
    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    pub fn commands(&self) -> &[FrameCommand] {
        &self.commands
    }

    /// All transitions in order, including those carried by rendering.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.commands.iter().filter_map(|c| match c {
            FrameCommand::Transition(t) | FrameCommand::BeginRendering { transition: t, .. } => {
                Some(t)
            }
            _ => None,
        })
    }

    /// Layouts the given image passes through, starting with its initial one.
    pub fn layouts_of(&self, target: ImageTarget) -> Vec<ImageLayout> {
        let mut layouts = Vec::new();
        for t in self.transitions().filter(|t| t.target == target) {
            if layouts.is_empty() {
                layouts.push(t.old_layout);
            }
            layouts.push(t.new_layout);
        }
        layouts
    }

    /// Every uniform slot referenced by the plan's bindings.
    pub fn uniform_slots(&self) -> Vec<usize> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                FrameCommand::BindCompute(b) | FrameCommand::BindGraphics(b) => Some(b),
                _ => None,
            })
            .flat_map(DescriptorBindings::uniform_slots)
            .collect()
    }
}

/// Number of workgroups covering `resolution`, rounding up.
pub fn dispatch_size(resolution: Resolution, workgroup: [u32; 2]) -> [u32; 3] {
    [
        resolution.width.div_ceil(workgroup[0].max(1)),
        resolution.height.div_ceil(workgroup[1].max(1)),
        1,
    ]
}

/// Builds frame plans.
#[derive(Debug, Clone, Copy)]
pub struct CommandRecorder {
    workgroup: [u32; 2],
}

impl CommandRecorder {
    pub fn new(workgroup: [u32; 2]) -> Self {
        Self { workgroup }
    }

    pub fn workgroup(&self) -> [u32; 2] {
        self.workgroup
    }

    /// Compute pass bindings: storage intermediate image and frame params.
    pub fn compute_bindings(slot: usize) -> DescriptorBindings {
        DescriptorBindings::new()
            .with(
                0,
                BoundResource::StorageImage {
                    image: ImageTarget::Intermediate,
                    layout: ImageLayout::General,
                },
            )
            .with(1, BoundResource::UniformBuffer { slot })
    }

    /// Composite pass bindings: intermediate image, static texture and params.
    pub fn graphics_bindings(slot: usize) -> DescriptorBindings {
        DescriptorBindings::new()
            .with(
                0,
                BoundResource::SampledImage {
                    image: ImageTarget::Intermediate,
                    layout: ImageLayout::General,
                    sampler: SamplerKind::Clamp,
                },
            )
            .with(
                1,
                BoundResource::SampledImage {
                    image: ImageTarget::StaticTexture,
                    layout: ImageLayout::ShaderReadOnly,
                    sampler: SamplerKind::Repeat,
                },
            )
            .with(2, BoundResource::UniformBuffer { slot })
    }

    /// Build the command plan for one frame.
    pub fn record(
        &self,
        slot: &AcquiredSlot<'_>,
        image: &SwapchainImage,
        params: &FrameParams,
    ) -> FramePlan {
        let slot_index = slot.index();
        let commands = vec![
            FrameCommand::Transition(Transition {
                target: ImageTarget::Presentable,
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::TransferDst,
                src: Access::None,
                dst: Access::TransferWrite,
            }),
            // The previous frame's composite may still be sampling the image.
            FrameCommand::Transition(Transition {
                target: ImageTarget::Intermediate,
                old_layout: ImageLayout::Undefined,
                new_layout: ImageLayout::General,
                src: Access::FragmentSampledRead,
                dst: Access::ComputeWrite,
            }),
            FrameCommand::BindCompute(Self::compute_bindings(slot_index)),
            FrameCommand::Dispatch {
                groups: dispatch_size(params.resolution(), self.workgroup),
            },
            FrameCommand::Transition(Transition {
                target: ImageTarget::Intermediate,
                old_layout: ImageLayout::General,
                new_layout: ImageLayout::General,
                src: Access::ComputeWrite,
                dst: Access::FragmentSampledRead,
            }),
            FrameCommand::BeginRendering {
                area: image.resolution(),
                transition: Transition {
                    target: ImageTarget::Presentable,
                    old_layout: ImageLayout::TransferDst,
                    new_layout: ImageLayout::ColorAttachment,
                    src: Access::TransferWrite,
                    dst: Access::ColorAttachmentWrite,
                },
            },
            FrameCommand::BindGraphics(Self::graphics_bindings(slot_index)),
            FrameCommand::Draw {
                vertex_count: 3,
                instance_count: 1,
            },
            FrameCommand::EndRendering,
            FrameCommand::Transition(Transition {
                target: ImageTarget::Presentable,
                old_layout: ImageLayout::ColorAttachment,
                new_layout: ImageLayout::PresentSrc,
                src: Access::ColorAttachmentWrite,
                dst: Access::None,
            }),
        ];

        FramePlan {
            slot: slot_index,
            image_index: image.index(),
            commands,
        }
    }
}
