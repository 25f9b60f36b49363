//! Shared value types.

use glam::UVec2;

use crate::error::{Error, Result};

/// Drawable or render resolution in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    /// Create a new resolution.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A minimized window reports a zero area surface.
    pub const fn is_zero_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width divided by height, or 0.0 for a zero area resolution.
    pub fn aspect_ratio(&self) -> f32 {
        if self.is_zero_area() {
            0.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl From<UVec2> for Resolution {
    fn from(v: UVec2) -> Self {
        Self::new(v.x, v.y)
    }
}

impl From<Resolution> for UVec2 {
    fn from(r: Resolution) -> Self {
        Self::new(r.width, r.height)
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Properties requested when (re)creating the presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentConfig {
    pub resolution: Resolution,
    pub vsync: bool,
}

impl PresentConfig {
    pub const fn new(resolution: Resolution, vsync: bool) -> Self {
        Self { resolution, vsync }
    }
}

/// Decoded pixel data for a static texture.
#[derive(Debug, Clone)]
pub struct TextureData {
    width: u32,
    height: u32,
    channels: u32,
    pixels: Vec<u8>,
}

impl TextureData {
    /// Wrap decoded pixels, checking that the buffer matches the dimensions.
    pub fn new(width: u32, height: u32, channels: u32, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidData(format!(
                "texture has zero extent ({width}x{height})"
            )));
        }
        if !(1..=4).contains(&channels) {
            return Err(Error::InvalidData(format!(
                "unsupported channel count {channels}"
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if pixels.len() != expected {
            return Err(Error::InvalidData(format!(
                "texture byte length {} does not match {width}x{height}x{channels} = {expected}",
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            channels,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> u64 {
        self.pixels.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_area_detection() {
        assert!(Resolution::new(0, 0).is_zero_area());
        assert!(Resolution::new(1280, 0).is_zero_area());
        assert!(Resolution::new(0, 720).is_zero_area());
        assert!(!Resolution::new(1280, 720).is_zero_area());
    }

    #[test]
    fn uvec2_conversion() {
        let res = Resolution::from(UVec2::new(800, 600));
        assert_eq!(res, Resolution::new(800, 600));
        assert_eq!(UVec2::from(res), UVec2::new(800, 600));
    }

    #[test]
    fn display_format() {
        assert_eq!(Resolution::new(1280, 720).to_string(), "1280x720");
    }

    #[test]
    fn texture_data_validates_length() {
        assert!(TextureData::new(2, 2, 4, vec![0; 16]).is_ok());
        assert!(TextureData::new(2, 2, 4, vec![0; 15]).is_err());
        assert!(TextureData::new(0, 2, 4, Vec::new()).is_err());
        assert!(TextureData::new(2, 2, 5, vec![0; 20]).is_err());
    }
}
