//! Shaders for the inflight frames renderer.
//!
//! GLSL sources live in `shaders/` and are compiled to SPIR-V at build time
//! using shaderc.

use std::sync::OnceLock;

/// Embedded SPIR-V shader bytecode (raw bytes, may not be aligned).
mod spirv_bytes {
    /// Procedural texture compute shader.
    pub static TEXTURE_COMP: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/texture_comp.spv"));
    /// Fullscreen triangle vertex shader.
    pub static TOY_VERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/toy_vert.spv"));
    /// Composite fragment shader.
    pub static TOY_FRAG: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/toy_frag.spv"));
}

/// Convert byte slice to aligned u32 Vec (SPIR-V requires 4-byte alignment).
fn bytes_to_spirv(bytes: &[u8]) -> Vec<u32> {
    assert!(
        bytes.len() % 4 == 0,
        "SPIR-V bytecode must be 4-byte aligned"
    );
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

static TEXTURE_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static TOY_VERT_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();
static TOY_FRAG_SPIRV: OnceLock<Vec<u32>> = OnceLock::new();

/// Procedural texture compute shader.
pub fn texture_shader() -> &'static [u32] {
    TEXTURE_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TEXTURE_COMP))
}

/// Fullscreen triangle vertex shader.
pub fn toy_vertex_shader() -> &'static [u32] {
    TOY_VERT_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TOY_VERT))
}

/// Composite fragment shader.
pub fn toy_fragment_shader() -> &'static [u32] {
    TOY_FRAG_SPIRV.get_or_init(|| bytes_to_spirv(spirv_bytes::TOY_FRAG))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn shaders_load() {
        for shader in [texture_shader(), toy_vertex_shader(), toy_fragment_shader()] {
            assert_eq!(shader[0], SPIRV_MAGIC, "Invalid SPIR-V magic number");
            assert!(shader.len() > 20, "Shader too small");
        }
    }

    #[test]
    fn byte_conversion_is_little_endian() {
        assert_eq!(bytes_to_spirv(&[0x03, 0x02, 0x23, 0x07]), vec![SPIRV_MAGIC]);
    }
}
