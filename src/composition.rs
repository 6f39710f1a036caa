//! Print composition.
//!
//! [`render`] loads the thumbnails, plans the layout ([`plan_grid`] or
//! [`plan_timeline`]), and paints every thumbnail through the finisher.
//! [`compose`] additionally encodes the canvas and writes it atomically.
//!
//! # Example
//!
//! ```no_run
//! use movieprint::{LayoutSpec, Thumbnail, compose};
//!
//! let thumbnails: Vec<Thumbnail> = ["a.jpg", "b.jpg", "c.jpg"]
//!     .into_iter()
//!     .map(Thumbnail::new)
//!     .collect();
//! let spec = LayoutSpec::grid().with_columns(3).build()?;
//! let print = compose(&thumbnails, &spec, "print.png")?;
//! println!("{}x{}, {} thumbnails", print.width, print.height, print.items.len());
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```

use std::path::{Path, PathBuf};

use image::{DynamicImage, RgbaImage, imageops::FilterType};

use crate::{
    configuration::{Color, LabelContent, LayoutMode, LayoutSpec, OutputFormat},
    error::MoviePrintError,
    finisher::{
        check_output_path, draw_label, encode_with_limit, fill_crop, rotate, round_corners,
        scaled_corner_radius, write_atomic,
    },
    frame::{FrameRecord, LayoutItem},
    grid::{Placement, plan_grid},
    label::{GLYPH_HEIGHT, draw_text},
    timecode::format_timecode_short,
    timeline::{WeightedSize, plan_timeline},
};

/// Canvases above this many pixels are refused instead of allocated.
const MAX_CANVAS_PIXELS: u64 = 1 << 28;

/// One image handed to the compositor.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    /// Image file.
    pub path: PathBuf,
    /// Timeline weight; ignored by the grid.
    pub weight: f64,
    /// Text drawn when the layout has a label style.
    pub label: Option<String>,
}

impl Thumbnail {
    /// A thumbnail with weight 1 and no label.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            weight: 1.0,
            label: None,
        }
    }

    /// Build from an extracted frame: weight from its shot span, label from
    /// `content`.
    pub fn from_record(record: &FrameRecord, content: Option<LabelContent>) -> Self {
        Self {
            path: record.path.clone(),
            weight: record.weight(),
            label: content.map(|content| match content {
                LabelContent::Timecode => format_timecode_short(record.timestamp_sec),
                LabelContent::FrameNumber => format!("#{}", record.frame_number),
            }),
        }
    }

    /// Set the timeline weight.
    #[must_use]
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the label text.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A composed canvas that has not been encoded yet.
#[derive(Debug, Clone)]
pub struct RenderedPrint {
    /// The canvas.
    pub image: DynamicImage,
    /// Where each thumbnail landed.
    pub items: Vec<LayoutItem>,
    /// Inputs that could not be read and were left out.
    pub skipped: Vec<PathBuf>,
}

/// Output handling for [`compose_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompositionOptions {
    /// Replace an existing file at the output path.
    pub overwrite: bool,
    /// Shrink the encoded print until it fits in this many KiB.
    pub max_output_kib: Option<u64>,
}

/// A print written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPrint {
    /// Output file.
    pub path: PathBuf,
    /// Final width.
    pub width: u32,
    /// Final height.
    pub height: u32,
    /// Placed thumbnails in final-image coordinates.
    pub items: Vec<LayoutItem>,
    /// Inputs that could not be read and were left out.
    pub skipped: Vec<PathBuf>,
    /// Overall downscale applied by the size cap (1.0 when none).
    pub scale: f64,
    /// Size of the written file in bytes.
    pub file_size: u64,
}

/// Compose a print in memory.
///
/// Unreadable inputs are skipped with a warning. The rotation in `spec` is
/// applied to each thumbnail before it is resized.
///
/// # Errors
///
/// - [`MoviePrintError::NoPlaceableImages`] when nothing could be loaded or
///   placed.
/// - [`MoviePrintError::CompositionFailed`] when the canvas would be too
///   large to allocate or the layout leaves no room.
/// - [`MoviePrintError::InvalidParameters`] for an invalid `spec`.
pub fn render(thumbnails: &[Thumbnail], spec: &LayoutSpec) -> Result<RenderedPrint, MoviePrintError> {
    spec.validate()?;

    let mut skipped = Vec::new();
    let mut loaded: Vec<(&Thumbnail, DynamicImage)> = Vec::with_capacity(thumbnails.len());
    for thumbnail in thumbnails {
        match image::open(&thumbnail.path) {
            Ok(image) => loaded.push((thumbnail, rotate(image, spec.rotation))),
            Err(error) => {
                log::warn!("Skipping unreadable image {}: {error}", thumbnail.path.display());
                skipped.push(thumbnail.path.clone());
            }
        }
    }
    if loaded.is_empty() {
        return Err(MoviePrintError::NoPlaceableImages);
    }

    let (canvas_width, canvas_height, fill, reference_width, placements) = match spec.mode {
        LayoutMode::Grid => {
            let sizes: Vec<(u32, u32)> = loaded
                .iter()
                .map(|(_, image)| (image.width(), image.height()))
                .collect();
            let plan = plan_grid(&sizes, spec)?;
            (
                plan.canvas_width,
                plan.canvas_height,
                plan.fill,
                Some(plan.cell_width),
                plan.placements,
            )
        }
        LayoutMode::Timeline => {
            let sizes: Vec<WeightedSize> = loaded
                .iter()
                .map(|(thumbnail, image)| WeightedSize {
                    width: image.width(),
                    height: image.height(),
                    weight: thumbnail.weight,
                })
                .collect();
            let plan = plan_timeline(&sizes, spec)?;
            (plan.canvas_width, plan.canvas_height, true, None, plan.placements)
        }
    };

    if placements.is_empty() {
        return Err(MoviePrintError::NoPlaceableImages);
    }
    if canvas_width as u64 * canvas_height as u64 > MAX_CANVAS_PIXELS {
        return Err(MoviePrintError::CompositionFailed(format!(
            "canvas of {canvas_width}x{canvas_height} is too large"
        )));
    }

    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, spec.background.to_rgba());
    draw_header(&mut canvas, spec);

    let mut items = Vec::with_capacity(placements.len());
    for placement in &placements {
        let (thumbnail, image) = &loaded[placement.index];
        let mut tile = paint_tile(image, placement, fill);

        if let (Some(style), Some(text)) = (&spec.label, &thumbnail.label) {
            draw_label(&mut tile, text, style);
        }
        let radius = scaled_corner_radius(
            spec.corner_radius,
            reference_width.unwrap_or(placement.width),
        );
        round_corners(&mut tile, radius);

        image::imageops::overlay(&mut canvas, &tile, placement.x as i64, placement.y as i64);
        items.push(LayoutItem::new(
            &thumbnail.path,
            placement.x,
            placement.y,
            placement.width,
            placement.height,
        ));
    }

    log::info!(
        "Composed {} thumbnails on a {canvas_width}x{canvas_height} {:?} canvas",
        items.len(),
        spec.mode
    );
    Ok(RenderedPrint {
        image: DynamicImage::ImageRgba8(canvas),
        items,
        skipped,
    })
}

fn paint_tile(image: &DynamicImage, placement: &Placement, fill: bool) -> RgbaImage {
    let resized = if fill {
        fill_crop(image, placement.width, placement.height)
    } else {
        image.resize_exact(placement.width, placement.height, FilterType::Lanczos3)
    };
    resized.to_rgba8()
}

fn draw_header(canvas: &mut RgbaImage, spec: &LayoutSpec) {
    let Some(text) = spec.header_text.as_deref().filter(|_| spec.header_height > 0) else {
        return;
    };
    let scale = (spec.header_height / 2 / GLYPH_HEIGHT).max(1);
    let text_height = GLYPH_HEIGHT * scale;
    let x = (spec.margin + spec.padding) as i64;
    let y = spec.margin as i64 + (spec.header_height.saturating_sub(text_height) / 2) as i64;
    draw_text(canvas, x, y, text, scale, contrasting(spec.background).to_rgba());
}

/// Black on light backgrounds, white on dark ones.
fn contrasting(background: Color) -> Color {
    let [red, green, blue, _] = background.0;
    let luma = 0.299 * red as f64 + 0.587 * green as f64 + 0.114 * blue as f64;
    if luma > 140.0 { Color::BLACK } else { Color::WHITE }
}

/// Compose and write a print, refusing to replace an existing file.
///
/// The output format follows the extension of `output_path` (PNG unless it
/// is `.jpg`/`.jpeg`).
///
/// # Errors
///
/// Everything [`render`] returns, plus [`MoviePrintError::OutputExists`]
/// and [`MoviePrintError::CompositionFailed`] for write failures.
pub fn compose<P: AsRef<Path>>(
    thumbnails: &[Thumbnail],
    spec: &LayoutSpec,
    output_path: P,
) -> Result<ComposedPrint, MoviePrintError> {
    compose_with_options(thumbnails, spec, output_path, CompositionOptions::default())
}

/// Compose and write a print with explicit output handling.
///
/// # Errors
///
/// Same as [`compose`].
pub fn compose_with_options<P: AsRef<Path>>(
    thumbnails: &[Thumbnail],
    spec: &LayoutSpec,
    output_path: P,
    options: CompositionOptions,
) -> Result<ComposedPrint, MoviePrintError> {
    let output_path = output_path.as_ref();
    check_output_path(output_path, options.overwrite)?;

    let rendered = render(thumbnails, spec)?;
    let format = OutputFormat::from_path(output_path).unwrap_or(OutputFormat::Png);
    let encoded = encode_with_limit(&rendered.image, format, spec.quality, options.max_output_kib)
        .map_err(|error| MoviePrintError::CompositionFailed(format!("encoding failed: {error}")))?;
    write_atomic(&encoded.bytes, output_path)?;

    let items = if encoded.scale < 1.0 {
        rendered
            .items
            .iter()
            .map(|item| item.scaled(encoded.scale))
            .collect()
    } else {
        rendered.items
    };

    log::info!(
        "Wrote {} ({}x{}, {} KiB)",
        output_path.display(),
        encoded.width,
        encoded.height,
        encoded.bytes.len() / 1024
    );
    Ok(ComposedPrint {
        path: output_path.to_path_buf(),
        width: encoded.width,
        height: encoded.height,
        items,
        skipped: rendered.skipped,
        scale: encoded.scale,
        file_size: encoded.bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::configuration::{LabelStyle, Rotation};

    fn write_images(dir: &Path, count: usize, width: u32, height: u32) -> Vec<Thumbnail> {
        (0..count)
            .map(|index| {
                let path = dir.join(format!("img_{index:02}.png"));
                RgbaImage::from_pixel(width, height, Rgba([index as u8 * 20, 90, 200, 255]))
                    .save(&path)
                    .unwrap();
                Thumbnail::new(path)
            })
            .collect()
    }

    #[test]
    fn unreadable_inputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut thumbnails = write_images(dir.path(), 2, 16, 9);
        thumbnails.push(Thumbnail::new(dir.path().join("missing.png")));
        let spec = LayoutSpec::grid().with_columns(3);
        let rendered = render(&thumbnails, &spec).unwrap();
        assert_eq!(rendered.items.len(), 2);
        assert_eq!(rendered.skipped, vec![dir.path().join("missing.png")]);
    }

    #[test]
    fn nothing_readable_is_no_placeable_images() {
        let dir = tempfile::tempdir().unwrap();
        let thumbnails = vec![Thumbnail::new(dir.path().join("missing.png"))];
        assert!(matches!(
            render(&thumbnails, &LayoutSpec::grid()),
            Err(MoviePrintError::NoPlaceableImages)
        ));
    }

    #[test]
    fn rotation_happens_before_layout() {
        let dir = tempfile::tempdir().unwrap();
        let thumbnails = write_images(dir.path(), 1, 40, 10);
        let spec = LayoutSpec::grid()
            .with_columns(1)
            .with_padding(0)
            .with_rotation(Rotation::Clockwise90);
        let rendered = render(&thumbnails, &spec).unwrap();
        assert_eq!((rendered.image.width(), rendered.image.height()), (10, 40));
    }

    #[test]
    fn labels_and_corners_render() {
        let dir = tempfile::tempdir().unwrap();
        let thumbnails: Vec<Thumbnail> = write_images(dir.path(), 2, 96, 54)
            .into_iter()
            .map(|thumbnail| thumbnail.with_label("00:00:01"))
            .collect();
        let spec = LayoutSpec::grid()
            .with_columns(2)
            .with_padding(0)
            .with_background(Color::WHITE)
            .with_corner_radius(480)
            .with_label(LabelStyle::default().with_scale(1));
        let rendered = render(&thumbnails, &spec).unwrap().image.to_rgba8();
        assert_eq!(rendered.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn compose_refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let thumbnails = write_images(dir.path(), 3, 20, 20);
        let output = dir.path().join("print.jpg");
        let spec = LayoutSpec::grid().with_columns(3);

        let print = compose(&thumbnails, &spec, &output).unwrap();
        assert!(output.is_file());
        assert_eq!(print.items.len(), 3);
        assert!(matches!(
            compose(&thumbnails, &spec, &output),
            Err(MoviePrintError::OutputExists(_))
        ));

        let options = CompositionOptions {
            overwrite: true,
            max_output_kib: None,
        };
        assert!(compose_with_options(&thumbnails, &spec, &output, options).is_ok());
    }
}
