//! Upload normalization: every image leaves here as a bounded RGB JPEG,
//! base64-encoded for inline transmission to the models.

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::RgbImage;
use service_core::error::AppError;
use thiserror::Error;

/// Longest edge allowed after normalization.
pub const MAX_DIMENSION: u32 = 2048;
pub const JPEG_QUALITY: u8 = 85;
pub const ENCODED_MIME_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("cannot decode image: {0}")]
    Decode(String),

    #[error("cannot encode image: {0}")]
    Encode(String),
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        AppError::ImageProcessing(err.to_string())
    }
}

/// Normalized upload, ready to embed in a model message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    base64_payload: String,
    width: u32,
    height: u32,
}

impl EncodedImage {
    pub fn base64_payload(&self) -> &str {
        &self.base64_payload
    }

    pub fn mime_type(&self) -> &'static str {
        ENCODED_MIME_TYPE
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", ENCODED_MIME_TYPE, self.base64_payload)
    }
}

/// Decode, flatten to RGB, bound to [`MAX_DIMENSION`] and re-encode as JPEG.
///
/// CPU bound; call through `spawn_blocking` from async code.
pub fn normalize(raw: &[u8]) -> Result<EncodedImage, ImageError> {
    let decoded = image::load_from_memory(raw).map_err(|e| ImageError::Decode(e.to_string()))?;

    // Alpha and palette information is dropped, not composited.
    let rgb = decoded.to_rgb8();
    let rgb = downscale(rgb);
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ImageError::Encode(e.to_string()))?;

    tracing::debug!(
        width,
        height,
        original_bytes = raw.len(),
        encoded_bytes = jpeg.len(),
        "Image normalized"
    );

    Ok(EncodedImage {
        base64_payload: base64::engine::general_purpose::STANDARD.encode(&jpeg),
        width,
        height,
    })
}

/// Target size keeping aspect ratio with the longer side at `max`. Never upscales.
pub fn bounded_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }

    let scale = |short: u32, long: u32| -> u32 {
        let scaled = (short as f64 * max as f64 / long as f64).round() as u32;
        scaled.max(1)
    };

    if width >= height {
        (max, scale(height, width))
    } else {
        (scale(width, height), max)
    }
}

fn downscale(rgb: RgbImage) -> RgbImage {
    let (width, height) = rgb.dimensions();
    let (target_w, target_h) = bounded_dimensions(width, height, MAX_DIMENSION);

    if (target_w, target_h) == (width, height) {
        return rgb;
    }

    imageops::resize(&rgb, target_w, target_h, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode(image: DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    fn decode_payload(encoded: &EncodedImage) -> DynamicImage {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded.base64_payload())
            .unwrap();
        image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg).unwrap()
    }

    #[test]
    fn small_image_keeps_dimensions() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 480, image::Rgb([10, 20, 30]))),
            ImageFormat::Png,
        );

        let encoded = normalize(&png).unwrap();

        assert_eq!(encoded.dimensions(), (640, 480));
        assert_eq!(encoded.mime_type(), "image/jpeg");
        assert!(encoded.data_uri().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn oversized_image_is_bounded_with_aspect_ratio() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::new(2500, 1000)),
            ImageFormat::Png,
        );

        let encoded = normalize(&png).unwrap();

        assert_eq!(encoded.dimensions(), (2048, 819));
        assert_eq!(decode_payload(&encoded).width(), 2048);
    }

    #[test]
    fn tall_image_bounds_height() {
        assert_eq!(bounded_dimensions(1000, 4000, 2048), (512, 2048));
        assert_eq!(bounded_dimensions(4000, 3000, 2048), (2048, 1536));
        assert_eq!(bounded_dimensions(2048, 2048, 2048), (2048, 2048));
        assert_eq!(bounded_dimensions(100_000, 10, 2048), (2048, 1));
    }

    #[test]
    fn alpha_channel_is_flattened_to_rgb() {
        let png = encode(
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(32, 16, Rgba([200, 100, 50, 0]))),
            ImageFormat::Png,
        );

        let encoded = normalize(&png).unwrap();
        let decoded = decode_payload(&encoded);

        assert_eq!(decoded.color(), image::ColorType::Rgb8);
        assert_eq!(encoded.dimensions(), (32, 16));
    }

    #[test]
    fn gif_and_bmp_inputs_are_accepted() {
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])));

        for format in [ImageFormat::Gif, ImageFormat::Bmp] {
            let bytes = encode(source.clone(), format);
            assert_eq!(normalize(&bytes).unwrap().dimensions(), (8, 8));
        }
    }

    #[test]
    fn renormalizing_output_keeps_dimensions() {
        let png = encode(
            DynamicImage::ImageRgb8(RgbImage::new(3000, 1200)),
            ImageFormat::Png,
        );

        let first = normalize(&png).unwrap();
        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(first.base64_payload())
            .unwrap();
        let second = normalize(&jpeg).unwrap();

        assert_eq!(first.dimensions(), second.dimensions());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = normalize(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));

        let app_err: AppError = err.into();
        assert!(app_err.to_string().starts_with("Image processing failed"));
    }
}
