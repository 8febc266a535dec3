//! Raster image intake for burn-in
//!
//! Uploaded signature and stamp images are sniffed from magic bytes (never
//! trusted file extensions), decoded, flattened over white, and re-encoded
//! as baseline JPEG so they can be embedded directly as DCTDecode image
//! XObjects.

use image::codecs::jpeg::JpegEncoder;

use crate::error::CompositorError;

const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];

const JPEG_QUALITY: u8 = 90;

/// Raster formats accepted for placement images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Png,
    Jpeg,
}

/// Detect the format from magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Result<RasterFormat, CompositorError> {
    if bytes.starts_with(&PNG_MAGIC) {
        return Ok(RasterFormat::Png);
    }
    if bytes.starts_with(&JPEG_MAGIC) {
        return Ok(RasterFormat::Jpeg);
    }
    Err(CompositorError::UnsupportedFormat(format!(
        "unrecognized magic bytes (first bytes: {:02X?})",
        &bytes[..bytes.len().min(4)]
    )))
}

/// A DCTDecode-ready image with its pixel dimensions.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Decode raw upload bytes and produce an embeddable JPEG.
///
/// PNG alpha is composited over white: PDF image XObjects carry no alpha
/// channel, and signature scans are expected on a white page anyway.
pub fn prepare_image(bytes: &[u8]) -> Result<EncodedImage, CompositorError> {
    let format = match sniff_format(bytes)? {
        RasterFormat::Png => image::ImageFormat::Png,
        RasterFormat::Jpeg => image::ImageFormat::Jpeg,
    };
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| CompositorError::ImageDecode(e.to_string()))?;

    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = image::RgbImage::new(width, height);
    for (out, src) in rgb.pixels_mut().zip(rgba.pixels()) {
        let alpha = src[3] as u32;
        for c in 0..3 {
            out[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
    }

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|e| CompositorError::ImageEncode(e.to_string()))?;

    Ok(EncodedImage {
        jpeg,
        width,
        height,
    })
}

#[cfg(test)]
pub(crate) fn test_png(width: u32, height: u32) -> Vec<u8> {
    use image::{Rgba, RgbaImage};
    let img = RgbaImage::from_pixel(width, height, Rgba([20, 40, 160, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
    bytes
}
