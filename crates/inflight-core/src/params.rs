//! Per-frame uniform parameters.

use crate::types::Resolution;

/// Uniform block consumed by both the compute and the composite shaders.
///
/// This structure must match the layout in `texture.comp` and `toy.frag`:
/// ```glsl
/// layout(binding = N) uniform Params {
///     uint size_x;   // 4 bytes
///     uint size_y;   // 4 bytes
///     float time;    // 4 bytes
/// } params;
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameParams {
    /// Render target width in pixels.
    pub size_x: u32,
    /// Render target height in pixels.
    pub size_y: u32,
    /// Seconds elapsed since the start of the run.
    pub time: f32,
    /// Padding to a 16 byte std140 block.
    pub _padding: u32,
}

impl FrameParams {
    /// Size in bytes (16 bytes for std140 alignment).
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    pub fn new(resolution: Resolution, time: f32) -> Self {
        Self {
            size_x: resolution.width,
            size_y: resolution.height,
            time,
            _padding: 0,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.size_x, self.size_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_size() {
        assert_eq!(FrameParams::SIZE, 16);
    }

    #[test]
    fn params_layout() {
        assert_eq!(std::mem::offset_of!(FrameParams, size_x), 0);
        assert_eq!(std::mem::offset_of!(FrameParams, size_y), 4);
        assert_eq!(std::mem::offset_of!(FrameParams, time), 8);
    }

    #[test]
    fn params_carry_resolution() {
        let params = FrameParams::new(Resolution::new(1280, 720), 1.5);
        assert_eq!(params.resolution(), Resolution::new(1280, 720));
        assert_eq!(bytemuck::bytes_of(&params).len(), 16);
    }
}
