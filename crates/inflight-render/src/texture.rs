//! Static texture loading.

use std::path::Path;

use inflight_core::TextureData;

use crate::error::{RenderError, Result};

/// Load an image file as RGBA8 pixels.
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureData> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| RenderError::Asset(format!("Failed to load {}: {e}", path.display())))?;
    to_rgba8(image)
}

/// Decode an in-memory image as RGBA8 pixels.
pub fn decode_texture(bytes: &[u8]) -> Result<TextureData> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| RenderError::Asset(format!("Failed to decode texture: {e}")))?;
    to_rgba8(image)
}

fn to_rgba8(image: image::DynamicImage) -> Result<TextureData> {
    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    TextureData::new(width, height, 4, rgba.into_raw())
        .map_err(|e| RenderError::Asset(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn encode_png(image: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    #[test]
    fn grayscale_expands_to_rgba() {
        let gray = GrayImage::from_pixel(3, 2, Luma([200]));
        let texture = decode_texture(&encode_png(gray.into())).unwrap();

        assert_eq!(texture.width(), 3);
        assert_eq!(texture.height(), 2);
        assert_eq!(texture.channels(), 4);
        assert_eq!(texture.pixels().len(), 3 * 2 * 4);
        assert_eq!(&texture.pixels()[..4], &[200, 200, 200, 255]);
    }

    #[test]
    fn garbage_is_an_asset_error() {
        assert!(matches!(
            decode_texture(b"not an image"),
            Err(RenderError::Asset(_))
        ));
    }

    #[test]
    fn missing_file_is_an_asset_error() {
        assert!(matches!(
            load_texture("does/not/exist.png"),
            Err(RenderError::Asset(_))
        ));
    }
}
