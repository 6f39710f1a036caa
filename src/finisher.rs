//! Per-thumbnail post-processing and print encoding.
//!
//! Both compositors go through these helpers: rotation, fit or fill
//! resizing, corner rounding by alpha mask, label overlay, and the final
//! encode/write step with an optional size cap.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use image::{
    DynamicImage, GrayImage, Luma, RgbaImage,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilter, PngEncoder},
    },
    imageops::FilterType,
};

use crate::{
    configuration::{LabelPosition, LabelStyle, OutputFormat, Rotation},
    error::MoviePrintError,
    label::{draw_text, fill_rect, text_size},
};

/// Quality used for intermediate frame images.
const FRAME_JPEG_QUALITY: u8 = 95;
/// Thumbnail width at which the configured corner radius applies unscaled.
const CORNER_REFERENCE_WIDTH: f64 = 480.0;
/// Smallest overall downscale factor tried by the size cap.
const MIN_SCALE: f64 = 0.1;
/// Lowest JPEG quality tried by the size cap.
const MIN_QUALITY: u8 = 20;
/// Maximum number of re-encodes tried by the size cap.
const MAX_SIZE_ATTEMPTS: usize = 10;

/// Write an extracted frame, as JPEG when the extension asks for it.
pub(crate) fn save_frame_image(image: &DynamicImage, path: &Path) -> Result<(), MoviePrintError> {
    match OutputFormat::from_path(path) {
        Some(OutputFormat::Jpg) => {
            let writer = BufWriter::new(File::create(path)?);
            let encoder = JpegEncoder::new_with_quality(writer, FRAME_JPEG_QUALITY);
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        }
        _ => image.save(path)?,
    }
    Ok(())
}

/// Rotate clockwise. 90 and 270 swap width and height.
pub fn rotate(image: DynamicImage, rotation: Rotation) -> DynamicImage {
    match rotation {
        Rotation::None => image,
        Rotation::Clockwise90 => image.rotate90(),
        Rotation::Clockwise180 => image.rotate180(),
        Rotation::Clockwise270 => image.rotate270(),
    }
}

/// Rotate an image file and write it back to the same path.
///
/// # Errors
///
/// Returns [`MoviePrintError::ImageError`] or [`MoviePrintError::IoError`]
/// when the file cannot be read or rewritten.
pub fn rotate_file_in_place(path: &Path, rotation: Rotation) -> Result<(), MoviePrintError> {
    if rotation == Rotation::None {
        return Ok(());
    }
    let image = rotate(image::open(path)?, rotation);
    save_frame_image(&image, path)
}

/// Resize and center-crop to exactly `width × height`.
pub fn fill_crop(image: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    image.resize_to_fill(width.max(1), height.max(1), FilterType::Lanczos3)
}

/// Scale a corner radius configured for 480px thumbnails to `cell_width`.
pub fn scaled_corner_radius(radius: u32, cell_width: u32) -> u32 {
    (radius as f64 * cell_width as f64 / CORNER_REFERENCE_WIDTH).round() as u32
}

/// Single-channel mask of a filled rounded rectangle, anti-aliased along the
/// arcs.
pub fn rounded_mask(width: u32, height: u32, radius: u32) -> GrayImage {
    let radius = radius.min(width / 2).min(height / 2) as f64;
    let (right, bottom) = (width as f64 - radius, height as f64 - radius);

    GrayImage::from_fn(width, height, |x, y| {
        let (px, py) = (x as f64 + 0.5, y as f64 + 0.5);
        let dx = (radius - px).max(px - right).max(0.0);
        let dy = (radius - py).max(py - bottom).max(0.0);
        if dx == 0.0 || dy == 0.0 {
            return Luma([255]);
        }
        let coverage = (radius - (dx * dx + dy * dy).sqrt() + 0.5).clamp(0.0, 1.0);
        Luma([(coverage * 255.0).round() as u8])
    })
}

/// Multiply a rounded-rectangle mask into the alpha channel.
pub fn round_corners(image: &mut RgbaImage, radius: u32) {
    if radius == 0 {
        return;
    }
    let mask = rounded_mask(image.width(), image.height(), radius);
    for (pixel, coverage) in image.pixels_mut().zip(mask.pixels()) {
        pixel.0[3] = (pixel.0[3] as u16 * coverage.0[0] as u16 / 255) as u8;
    }
}

/// Draw `text` in a filled box anchored to one corner of `image`.
pub fn draw_label(image: &mut RgbaImage, text: &str, style: &LabelStyle) {
    if text.is_empty() {
        return;
    }
    let (text_width, text_height) = text_size(text, style.scale);
    let box_width = text_width + 2 * style.margin;
    let box_height = text_height + 2 * style.margin;
    let margin = style.margin as i64;

    let left = margin;
    let right = image.width() as i64 - margin - box_width as i64;
    let top = margin;
    let bottom = image.height() as i64 - margin - box_height as i64;
    let (x, y) = match style.position {
        LabelPosition::TopLeft => (left, top),
        LabelPosition::TopRight => (right, top),
        LabelPosition::BottomLeft => (left, bottom),
        LabelPosition::BottomRight => (right, bottom),
    };

    fill_rect(image, x, y, box_width, box_height, style.background.to_rgba());
    draw_text(
        image,
        x + margin,
        y + margin,
        text,
        style.scale,
        style.text_color.to_rgba(),
    );
}

/// Encode a print in memory.
///
/// JPEG is written at `quality` with full-resolution chroma (no chroma
/// subsampling at any quality). PNG uses the strongest lossless compression.
pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, MoviePrintError> {
    let mut bytes = Vec::new();
    match format {
        OutputFormat::Jpg => {
            let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100));
            DynamicImage::ImageRgb8(image.to_rgb8()).write_with_encoder(encoder)?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, PngFilter::Adaptive);
            image.write_with_encoder(encoder)?;
        }
    }
    Ok(bytes)
}

/// An encoded print and the transform applied to reach it.
#[derive(Debug, Clone)]
pub struct EncodedPrint {
    /// Encoded file contents.
    pub bytes: Vec<u8>,
    /// Overall scale relative to the composed canvas.
    pub scale: f64,
    /// JPEG quality actually used.
    pub quality: u8,
    /// Final width.
    pub width: u32,
    /// Final height.
    pub height: u32,
}

/// Encode `canvas`, shrinking it until it fits in `max_kib` when a cap is
/// given.
///
/// Each attempt scales by `sqrt(limit / current)` (never below an overall
/// factor of 0.1) and lowers JPEG quality by 5 down to 20. After 10 attempts
/// the last result is kept with a warning.
pub fn encode_with_limit(
    canvas: &DynamicImage,
    format: OutputFormat,
    quality: u8,
    max_kib: Option<u64>,
) -> Result<EncodedPrint, MoviePrintError> {
    let mut print = EncodedPrint {
        bytes: encode(canvas, format, quality)?,
        scale: 1.0,
        quality,
        width: canvas.width(),
        height: canvas.height(),
    };
    let Some(limit) = max_kib.map(|kib| kib.saturating_mul(1024)) else {
        return Ok(print);
    };

    for attempt in 1..=MAX_SIZE_ATTEMPTS {
        let size = print.bytes.len() as u64;
        if size <= limit {
            return Ok(print);
        }

        let ratio = (limit as f64 / size as f64).sqrt();
        let scale = (print.scale * ratio).max(MIN_SCALE);
        let quality = match format {
            OutputFormat::Jpg => print.quality.saturating_sub(5).max(MIN_QUALITY),
            OutputFormat::Png => print.quality,
        };
        if scale == print.scale && quality == print.quality {
            break;
        }

        let width = ((canvas.width() as f64 * scale).round() as u32).max(1);
        let height = ((canvas.height() as f64 * scale).round() as u32).max(1);
        log::debug!(
            "Size cap attempt {attempt}: {size} bytes > {limit}; scale {scale:.3}, quality {quality}"
        );
        let resized = canvas.resize_exact(width, height, FilterType::Lanczos3);
        print = EncodedPrint {
            bytes: encode(&resized, format, quality)?,
            scale,
            quality,
            width,
            height,
        };
    }

    if print.bytes.len() as u64 > limit {
        log::warn!(
            "Could not bring the print under {} KiB; keeping {} KiB at {}x{}",
            limit / 1024,
            print.bytes.len() / 1024,
            print.width,
            print.height
        );
    }
    Ok(print)
}

/// Fail with [`MoviePrintError::OutputExists`] unless overwriting is allowed.
pub fn check_output_path(path: &Path, overwrite: bool) -> Result<(), MoviePrintError> {
    if !overwrite && path.exists() {
        return Err(MoviePrintError::OutputExists(path.to_path_buf()));
    }
    Ok(())
}

/// Write `bytes` to `path` through a temporary file in the same directory,
/// so a failed write never leaves a partial file behind.
///
/// # Errors
///
/// Any failure is logged and returned as
/// [`MoviePrintError::CompositionFailed`].
pub fn write_atomic(bytes: &[u8], path: &Path) -> Result<(), MoviePrintError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let result = tempfile::NamedTempFile::new_in(parent)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.flush()?;
            Ok(file)
        })
        .and_then(|file| file.persist(path).map(|_| ()).map_err(|error| error.error));

    result.map_err(|error| {
        log::error!("Failed to write {}: {error}", path.display());
        MoviePrintError::CompositionFailed(format!("could not write {}: {error}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::configuration::Color;

    #[test]
    fn quarter_turns_swap_dimensions() {
        let image = DynamicImage::new_rgb8(40, 10);
        let rotated = rotate(image.clone(), Rotation::Clockwise90);
        assert_eq!((rotated.width(), rotated.height()), (10, 40));
        let rotated = rotate(image, Rotation::Clockwise180);
        assert_eq!((rotated.width(), rotated.height()), (40, 10));
    }

    #[test]
    fn corner_radius_scales_with_cell_width() {
        assert_eq!(scaled_corner_radius(24, 480), 24);
        assert_eq!(scaled_corner_radius(24, 240), 12);
        assert_eq!(scaled_corner_radius(0, 1000), 0);
    }

    #[test]
    fn mask_clears_corners_only() {
        let mask = rounded_mask(20, 20, 6);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(19, 19).0[0], 0);
        assert_eq!(mask.get_pixel(10, 0).0[0], 255);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
    }

    #[test]
    fn rounding_multiplies_existing_alpha() {
        let mut image = RgbaImage::from_pixel(20, 20, Rgba([10, 20, 30, 128]));
        round_corners(&mut image, 6);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(10, 10).0[3], 128);
    }

    #[test]
    fn label_box_sits_in_requested_corner() {
        let style = LabelStyle::default()
            .with_position(LabelPosition::TopLeft)
            .with_colors(Color::WHITE, Color::BLACK)
            .with_scale(1)
            .with_margin(2);
        let mut image = RgbaImage::from_pixel(60, 30, Rgba([255, 0, 0, 255]));
        draw_label(&mut image, "12", &style);
        assert_eq!(image.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(image.get_pixel(59, 29), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn size_cap_shrinks_output() {
        let canvas = DynamicImage::ImageRgba8(RgbaImage::from_fn(400, 300, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x ^ y) % 256) as u8, 255])
        }));
        let uncapped = encode_with_limit(&canvas, OutputFormat::Jpg, 95, None).unwrap();
        let capped = encode_with_limit(&canvas, OutputFormat::Jpg, 95, Some(8)).unwrap();
        assert!(capped.bytes.len() < uncapped.bytes.len());
        assert!(capped.scale < 1.0);
        assert!(capped.width < 400);
    }

    #[test]
    fn existing_output_needs_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("print.png");
        write_atomic(b"first", &path).unwrap();
        assert!(matches!(
            check_output_path(&path, false),
            Err(MoviePrintError::OutputExists(_))
        ));
        assert!(check_output_path(&path, true).is_ok());
        write_atomic(b"second", &path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn write_into_missing_directory_is_a_composition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("print.png");
        assert!(matches!(
            write_atomic(b"data", &path),
            Err(MoviePrintError::CompositionFailed(_))
        ));
    }
}
