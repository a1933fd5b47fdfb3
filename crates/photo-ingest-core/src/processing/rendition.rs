//! Thumbnail and large-preview renditions.
//!
//! Both tiers fit the source inside a target box while preserving its aspect
//! ratio, never enlarge it, flatten it to 8-bit RGB and encode it as JPEG.

use image::error::{EncodingError, ImageFormatHint, LimitError, LimitErrorKind};
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageError, ImageFormat, ImageResult, RgbImage};
use jpeg_encoder::{ColorType as JpegColor, Encoder};
use log::debug;
use std::path::Path;

use crate::config::{Config, TargetBox};
use crate::error::{Error, Result};

/// Which of the two renditions is being produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenditionTier {
    /// Small inline image stored with the record; also the hash input
    Thumbnail,

    /// Large image written to the sharded preview tree
    Preview,
}

impl std::fmt::Display for RenditionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Thumbnail => write!(f, "thumbnail"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

/// Target box and encoder settings for one tier
#[derive(Debug, Clone, Copy)]
pub struct RenditionSpec {
    pub tier: RenditionTier,
    pub target: TargetBox,
    pub quality: u8,
    /// Build image-specific Huffman tables (smaller output, slower encode)
    pub optimize: bool,
}

impl RenditionSpec {
    pub fn thumbnail(config: &Config) -> Self {
        Self {
            tier: RenditionTier::Thumbnail,
            target: config.thumbnail_size,
            quality: config.thumbnail_quality,
            optimize: false,
        }
    }

    pub fn preview(config: &Config) -> Self {
        Self {
            tier: RenditionTier::Preview,
            target: config.preview_size,
            quality: config.preview_quality,
            optimize: true,
        }
    }
}

/// Dimensions of `width`x`height` scaled to fit inside `target`.
///
/// Images that already fit are returned unchanged.
pub fn fit_within(width: u32, height: u32, target: TargetBox) -> (u32, u32) {
    if width <= target.width && height <= target.height {
        return (width, height);
    }

    let scale = f64::min(
        target.width as f64 / width as f64,
        target.height as f64 / height as f64,
    );
    let fitted_width = ((width as f64 * scale).round() as u32).clamp(1, target.width);
    let fitted_height = ((height as f64 * scale).round() as u32).clamp(1, target.height);

    (fitted_width, fitted_height)
}

/// Decode a source image from disk
pub fn load_source(path: &Path) -> Result<DynamicImage> {
    image::open(path).map_err(|e| Error::Rendition {
        path: path.to_path_buf(),
        cause: e.to_string(),
    })
}

/// Resize, flatten and encode an already decoded image
pub fn render(img: &DynamicImage, spec: &RenditionSpec) -> ImageResult<Vec<u8>> {
    let (width, height) = img.dimensions();
    let (target_width, target_height) = fit_within(width, height, spec.target);

    let resized = if (target_width, target_height) == (width, height) {
        None
    } else {
        Some(match spec.tier {
            // Small output, speed matters more than filter quality
            RenditionTier::Thumbnail => img.thumbnail_exact(target_width, target_height),
            RenditionTier::Preview => {
                img.resize_exact(target_width, target_height, FilterType::Lanczos3)
            }
        })
    };

    let rgb = resized.as_ref().unwrap_or(img).to_rgb8();
    let buffer = encode_jpeg(&rgb, spec.quality, spec.optimize)?;

    debug!(
        "Rendered {} {}x{} -> {}x{} ({} bytes)",
        spec.tier,
        width,
        height,
        rgb.width(),
        rgb.height(),
        buffer.len()
    );

    Ok(buffer)
}

/// Encode 8-bit RGB pixels as baseline JPEG
pub fn encode_jpeg(rgb: &RgbImage, quality: u8, optimize: bool) -> ImageResult<Vec<u8>> {
    let dimension_error =
        || ImageError::Limits(LimitError::from_kind(LimitErrorKind::DimensionError));
    let width = u16::try_from(rgb.width()).map_err(|_| dimension_error())?;
    let height = u16::try_from(rgb.height()).map_err(|_| dimension_error())?;

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, quality);
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(rgb.as_raw(), width, height, JpegColor::Rgb)
        .map_err(|e| {
            ImageError::Encoding(EncodingError::new(
                ImageFormatHint::Exact(ImageFormat::Jpeg),
                e,
            ))
        })?;

    Ok(buffer)
}

/// Decode `source` and produce the encoded rendition for `spec`
pub fn generate(source: &Path, spec: &RenditionSpec) -> Result<Vec<u8>> {
    let img = load_source(source)?;
    render(&img, spec).map_err(|e| Error::Rendition {
        path: source.to_path_buf(),
        cause: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{block_image, write_png};
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_fit_within_downscales_preserving_aspect() {
        assert_eq!(fit_within(1600, 800, TargetBox::new(80, 80)), (80, 40));
        assert_eq!(fit_within(600, 1200, TargetBox::new(80, 80)), (40, 80));
        assert_eq!(fit_within(4000, 3000, TargetBox::new(1600, 1600)), (1600, 1200));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(fit_within(50, 30, TargetBox::new(80, 80)), (50, 30));
        assert_eq!(fit_within(80, 80, TargetBox::new(80, 80)), (80, 80));
    }

    #[test]
    fn test_fit_within_extreme_aspect_keeps_one_pixel() {
        assert_eq!(fit_within(10_000, 10, TargetBox::new(80, 80)), (80, 1));
    }

    #[test]
    fn test_small_source_keeps_dimensions() {
        let img = block_image(7, 60, 40);
        let spec = RenditionSpec {
            tier: RenditionTier::Thumbnail,
            target: TargetBox::new(80, 80),
            quality: 90,
            optimize: false,
        };

        let bytes = render(&img, &spec).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (60, 40));
    }

    #[test]
    fn test_preview_tier_fits_box() {
        let img = block_image(3, 400, 200);
        let spec = RenditionSpec {
            tier: RenditionTier::Preview,
            target: TargetBox::new(100, 100),
            quality: 85,
            optimize: true,
        };

        let bytes = render(&img, &spec).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 50));
    }

    #[test]
    fn test_preview_tier_uses_optimized_tables() {
        let config = Config::default();
        assert!(RenditionSpec::preview(&config).optimize);
        assert!(!RenditionSpec::thumbnail(&config).optimize);

        let rgb = block_image(5, 640, 480).to_rgb8();
        let plain = encode_jpeg(&rgb, 85, false).unwrap();
        let optimized = encode_jpeg(&rgb, 85, true).unwrap();

        assert!(
            optimized.len() < plain.len(),
            "optimized {} bytes, plain {} bytes",
            optimized.len(),
            plain.len()
        );
        let decoded = image::load_from_memory(&optimized).unwrap();
        assert_eq!(decoded.dimensions(), (640, 480));
    }

    #[test]
    fn test_encode_rejects_oversized_dimensions() {
        let rgb = RgbImage::new(70_000, 1);
        assert!(matches!(
            encode_jpeg(&rgb, 85, true),
            Err(ImageError::Limits(_))
        ));
    }

    #[test]
    fn test_alpha_source_is_flattened_to_rgb_jpeg() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(20, 20, Rgba([10, 200, 30, 0])));
        let spec = RenditionSpec::thumbnail(&Config::default());

        let bytes = render(&img, &spec).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgb8);
    }

    #[test]
    fn test_generate_from_file() {
        let dir = tempdir().unwrap();
        let path = write_png(dir.path(), "source.png", 11, 300, 150);

        let bytes = generate(&path, &RenditionSpec::thumbnail(&Config::default())).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (80, 40));
    }

    #[test]
    fn test_generate_corrupt_source_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"definitely not a jpeg").unwrap();

        match generate(&path, &RenditionSpec::thumbnail(&Config::default())) {
            Err(Error::Rendition { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("expected rendition failure, got {:?}", other),
        }
    }
}
