//! Vulkan frame backend.
//!
//! [`Renderer`] implements the frame pipeline's backend traits: a compute
//! pass writes a procedural texture into an intermediate image, and a
//! fullscreen graphics pass composites it with a static texture into the
//! presentable image.

pub mod error;
mod passes;
pub mod renderer;
mod slot;
mod targets;
pub mod texture;
mod translate;

pub use error::{RenderError, Result};
pub use renderer::{Renderer, RendererConfig};
pub use targets::{INTERMEDIATE_FORMAT, STATIC_TEXTURE_FORMAT};
pub use texture::{decode_texture, load_texture};
