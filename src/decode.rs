//! Decoding an encoded image buffer into a bounded list of RGB pixels.

use crate::config::ExtractorConfig;
use crate::error::ImageProcessingError;
use image::{ImageError, ImageFormat, ImageReader, Limits, RgbImage, imageops::FilterType};
use palette::Srgb;
use std::io::Cursor;

/// Decoded, RGB-normalized and downscaled pixels of one image.
///
/// Spatial layout is not kept; only the color distribution matters.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMatrix {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Srgb<u8>>,
}

impl PixelMatrix {
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

/// Result of the decode step, with the metadata the extractor reports.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub original_size: (u32, u32),
    pub matrix: PixelMatrix,
}

/// Decode `bytes`, drop alpha, and shrink so neither side exceeds
/// `config.max_dimension`.
///
/// The header is inspected before any pixel data is allocated; images
/// claiming more than `config.max_pixels` pixels are rejected outright.
pub fn decode_pixels(
    bytes: &[u8],
    config: &ExtractorConfig,
) -> Result<DecodedImage, ImageProcessingError> {
    let format = guess_reader(bytes)?
        .format()
        .ok_or(ImageProcessingError::UnsupportedFormat)?;

    let (width, height) = guess_reader(bytes)?
        .into_dimensions()
        .map_err(classify_image_error)?;
    check_area(width, height, config.max_pixels)?;

    let mut reader = guess_reader(bytes)?;
    reader.limits(decode_limits(config));
    let img = reader.decode().map_err(classify_image_error)?;

    // The header may lie about the size; trust only the decoded buffer.
    let (width, height) = (img.width(), img.height());
    check_area(width, height, config.max_pixels)?;

    let rgb = img.into_rgb8();
    let matrix = downscale(&rgb, config.max_dimension);

    Ok(DecodedImage {
        format,
        original_size: (width, height),
        matrix,
    })
}

fn guess_reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, ImageProcessingError> {
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageProcessingError::Decode(e.to_string()))
}

// Width and height are bounded by the area check; only allocation is capped here.
fn decode_limits(config: &ExtractorConfig) -> Limits {
    let mut limits = Limits::default();
    limits.max_alloc = Some(config.max_alloc_bytes);
    limits
}

fn check_area(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageProcessingError> {
    let area = u64::from(width) * u64::from(height);
    if area == 0 {
        return Err(ImageProcessingError::Empty);
    }
    if area > max_pixels {
        return Err(ImageProcessingError::TooLarge {
            width,
            height,
            max_pixels,
        });
    }
    Ok(())
}

fn classify_image_error(err: ImageError) -> ImageProcessingError {
    match err {
        ImageError::Limits(e) => ImageProcessingError::LimitExceeded(e.to_string()),
        ImageError::Unsupported(_) => ImageProcessingError::UnsupportedFormat,
        other => ImageProcessingError::Decode(other.to_string()),
    }
}

/// Size that fits within `max_side` on both axes, keeping the aspect ratio.
/// Images already within bounds keep their size. A bound of 0 is treated as 1.
pub fn target_size(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let max_side = max_side.max(1);
    if width <= max_side && height <= max_side {
        return (width, height);
    }
    let ratio = f64::from(max_side) / f64::from(width.max(height));
    let scale = |side: u32| ((f64::from(side) * ratio).round() as u32).clamp(1, max_side);
    (scale(width), scale(height))
}

fn downscale(rgb: &RgbImage, max_side: u32) -> PixelMatrix {
    let (w, h) = target_size(rgb.width(), rgb.height(), max_side);

    let resized;
    let source = if (w, h) == rgb.dimensions() {
        rgb
    } else {
        resized = image::imageops::resize(rgb, w, h, FilterType::CatmullRom);
        &resized
    };

    PixelMatrix {
        width: w,
        height: h,
        pixels: source
            .pixels()
            .map(|p| Srgb::new(p[0], p[1], p[2]))
            .collect(),
    }
}
