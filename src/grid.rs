//! Grid layout planning.
//!
//! [`plan_grid`] is pure: it turns image sizes and a [`LayoutSpec`] into a
//! canvas size and one placement per image, without touching pixels. The
//! compositor renders the plan.
//!
//! Two sizing disciplines exist:
//!
//! - **Dynamic** (default): the cell comes from the first few images (the
//!   widest, or the target thumbnail width, with the tallest aspect ratio)
//!   and the canvas grows to fit `ceil(count / columns)` rows. Thumbnails
//!   keep their aspect ratio and are centered in their cell.
//! - **Fixed**: the canvas is exactly the requested output size, cells are
//!   whatever fits, and thumbnails are crop-filled to their cell.
//!
//! When both `columns` and `rows` are given, `columns` drives the math.

use crate::{
    configuration::{LayoutMode, LayoutSpec},
    error::MoviePrintError,
};

/// How many leading images determine the dynamic cell size.
const CELL_SAMPLE_SIZE: usize = 5;

/// Rectangle assigned to one input image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Position of the image in the input sequence.
    pub index: usize,
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width the image is resized to.
    pub width: u32,
    /// Height the image is resized to.
    pub height: u32,
}

/// A complete grid plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridPlan {
    /// Canvas width.
    pub canvas_width: u32,
    /// Canvas height, header included.
    pub canvas_height: u32,
    /// Column count.
    pub columns: u32,
    /// Row count actually used.
    pub rows: u32,
    /// Cell width.
    pub cell_width: u32,
    /// Cell height.
    pub cell_height: u32,
    /// Whether thumbnails are crop-filled (fixed canvas) rather than fitted.
    pub fill: bool,
    /// One entry per placed image, in row-major order.
    pub placements: Vec<Placement>,
}

/// Largest size with the aspect of `width × height` that fits the box.
pub fn fit_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_width.max(1), max_height.max(1));
    }
    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    let fitted_width = ((width as f64 * ratio).round() as u32).clamp(1, max_width.max(1));
    let fitted_height = ((height as f64 * ratio).round() as u32).clamp(1, max_height.max(1));
    (fitted_width, fitted_height)
}

/// Row-major cursor threaded through the placement fold.
#[derive(Debug, Clone, Copy, Default)]
struct Cursor {
    column: u32,
    row: u32,
}

impl Cursor {
    fn advance(self, columns: u32) -> Self {
        if self.column + 1 == columns {
            Cursor {
                column: 0,
                row: self.row + 1,
            }
        } else {
            Cursor {
                column: self.column + 1,
                ..self
            }
        }
    }
}

/// Resolve the column count: `columns` if given, else `ceil(count / rows)`.
fn resolve_columns(spec: &LayoutSpec, count: usize) -> u32 {
    match (spec.columns, spec.rows) {
        (Some(columns), _) => columns.max(1),
        (None, Some(rows)) => (count as u32).div_ceil(rows.max(1)).max(1),
        (None, None) => 1,
    }
}

/// Plan a grid for images of the given `(width, height)` sizes.
///
/// # Errors
///
/// - [`MoviePrintError::NoPlaceableImages`] when `sizes` is empty.
/// - [`MoviePrintError::InvalidParameters`] when `spec` is not a valid grid
///   spec.
/// - [`MoviePrintError::CompositionFailed`] when a fixed canvas leaves no
///   room for a cell, or the sampled images have no usable size.
pub fn plan_grid(sizes: &[(u32, u32)], spec: &LayoutSpec) -> Result<GridPlan, MoviePrintError> {
    if spec.mode != LayoutMode::Grid {
        return Err(MoviePrintError::InvalidParameters(
            "grid planning needs a grid layout spec".to_string(),
        ));
    }
    spec.validate()?;
    if sizes.is_empty() {
        return Err(MoviePrintError::NoPlaceableImages);
    }

    if spec.fit_to_output {
        plan_fixed(sizes, spec)
    } else {
        plan_dynamic(sizes, spec)
    }
}

fn plan_dynamic(sizes: &[(u32, u32)], spec: &LayoutSpec) -> Result<GridPlan, MoviePrintError> {
    let sample = &sizes[..sizes.len().min(CELL_SAMPLE_SIZE)];
    let cell_width = spec
        .target_thumbnail_width
        .unwrap_or_else(|| sample.iter().map(|&(width, _)| width).max().unwrap_or(0));
    let cell_height = sample
        .iter()
        .filter(|&&(width, _)| width > 0)
        .map(|&(width, height)| (cell_width as u64 * height as u64 / width as u64) as u32)
        .max()
        .unwrap_or(0)
        .max(1);

    if cell_width == 0 {
        return Err(MoviePrintError::CompositionFailed(
            "could not determine a cell size from the images".to_string(),
        ));
    }

    let columns = resolve_columns(spec, sizes.len());
    let rows = (sizes.len() as u32).div_ceil(columns);
    let (padding, margin) = (spec.padding, spec.margin);
    let origin_y = margin + spec.header_height + padding;

    let (_, placements) = sizes.iter().enumerate().fold(
        (Cursor::default(), Vec::with_capacity(sizes.len())),
        |(cursor, mut placements), (index, &(width, height))| {
            let cell_x = margin + padding + cursor.column * (cell_width + padding);
            let cell_y = origin_y + cursor.row * (cell_height + padding);
            let (fitted_width, fitted_height) = fit_dimensions(width, height, cell_width, cell_height);
            placements.push(Placement {
                index,
                x: cell_x + (cell_width - fitted_width) / 2,
                y: cell_y + (cell_height - fitted_height) / 2,
                width: fitted_width,
                height: fitted_height,
            });
            (cursor.advance(columns), placements)
        },
    );

    let plan = GridPlan {
        canvas_width: columns * cell_width + (columns + 1) * padding + 2 * margin,
        canvas_height: rows * cell_height + (rows + 1) * padding + 2 * margin + spec.header_height,
        columns,
        rows,
        cell_width,
        cell_height,
        fill: false,
        placements,
    };
    log::debug!(
        "Dynamic grid: {}x{} cells of {}x{} on a {}x{} canvas",
        plan.columns,
        plan.rows,
        plan.cell_width,
        plan.cell_height,
        plan.canvas_width,
        plan.canvas_height
    );
    Ok(plan)
}

fn plan_fixed(sizes: &[(u32, u32)], spec: &LayoutSpec) -> Result<GridPlan, MoviePrintError> {
    let (Some(canvas_width), Some(canvas_height)) = (spec.output_width, spec.output_height) else {
        return Err(MoviePrintError::InvalidParameters(
            "a fixed canvas needs a width and height".to_string(),
        ));
    };

    let columns = resolve_columns(spec, sizes.len());
    let rows = spec
        .rows
        .unwrap_or_else(|| (sizes.len() as u32).div_ceil(columns))
        .max(1);
    let capacity = (columns as usize).saturating_mul(rows as usize);
    if sizes.len() > capacity {
        log::warn!(
            "{} images do not fit a {columns}x{rows} fixed grid; using the first {capacity}",
            sizes.len()
        );
    }
    let used = sizes.len().min(capacity);

    let (padding, margin) = (spec.padding as u64, spec.margin as u64);
    let available = |total: u32, count: u32, reserved: u64| {
        (total as u64)
            .saturating_sub(2 * margin + reserved + (count as u64 + 1) * padding)
            / count as u64
    };
    let cell_width = available(canvas_width, columns, 0) as u32;
    let cell_height = available(canvas_height, rows, spec.header_height as u64) as u32;
    if cell_width == 0 || cell_height == 0 {
        return Err(MoviePrintError::CompositionFailed(format!(
            "a {canvas_width}x{canvas_height} canvas leaves no room for {columns}x{rows} cells"
        )));
    }

    let (padding, margin) = (spec.padding, spec.margin);
    let origin_y = margin + spec.header_height + padding;
    let (_, placements) = (0..used).fold(
        (Cursor::default(), Vec::with_capacity(used)),
        |(cursor, mut placements), index| {
            placements.push(Placement {
                index,
                x: margin + padding + cursor.column * (cell_width + padding),
                y: origin_y + cursor.row * (cell_height + padding),
                width: cell_width,
                height: cell_height,
            });
            (cursor.advance(columns), placements)
        },
    );

    log::debug!(
        "Fixed grid: {columns}x{rows} cells of {cell_width}x{cell_height} on a \
         {canvas_width}x{canvas_height} canvas"
    );
    Ok(GridPlan {
        canvas_width,
        canvas_height,
        columns,
        rows,
        cell_width,
        cell_height,
        fill: true,
        placements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squares(count: usize, side: u32) -> Vec<(u32, u32)> {
        vec![(side, side); count]
    }

    #[test]
    fn columns_take_priority_over_rows() {
        let spec = LayoutSpec::grid()
            .with_grid(Some(5), Some(5))
            .with_padding(0)
            .with_margin(0);
        let plan = plan_grid(&squares(10, 10), &spec).unwrap();
        assert_eq!((plan.canvas_width, plan.canvas_height), (50, 20));
        assert_eq!((plan.columns, plan.rows), (5, 2));
    }

    #[test]
    fn rows_alone_derive_columns() {
        let spec = LayoutSpec::grid().with_grid(None, Some(3)).with_padding(0);
        let plan = plan_grid(&squares(7, 10), &spec).unwrap();
        assert_eq!(plan.columns, 3);
        assert_eq!(plan.rows, 3);
    }

    #[test]
    fn placement_is_row_major() {
        let spec = LayoutSpec::grid().with_columns(3).with_padding(2).with_margin(1);
        let plan = plan_grid(&squares(5, 10), &spec).unwrap();
        let origins: Vec<(u32, u32)> = plan.placements.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(origins, vec![(3, 3), (15, 3), (27, 3), (3, 15), (15, 15)]);
        assert_eq!((plan.canvas_width, plan.canvas_height), (3 * 10 + 4 * 2 + 2, 2 * 10 + 3 * 2 + 2));
    }

    #[test]
    fn dynamic_cells_use_tallest_sampled_aspect_and_center() {
        let spec = LayoutSpec::grid()
            .with_columns(2)
            .with_thumbnail_width(100)
            .with_padding(0);
        let plan = plan_grid(&[(200, 100), (100, 100)], &spec).unwrap();
        assert_eq!((plan.cell_width, plan.cell_height), (100, 100));
        assert_eq!(plan.placements[0], Placement { index: 0, x: 0, y: 25, width: 100, height: 50 });
        assert_eq!(plan.placements[1], Placement { index: 1, x: 100, y: 0, width: 100, height: 100 });
    }

    #[test]
    fn fixed_canvas_is_exact_and_capped() {
        let spec = LayoutSpec::grid()
            .with_grid(Some(3), Some(2))
            .with_padding(4)
            .with_margin(10)
            .with_fixed_canvas(641, 359);
        let plan = plan_grid(&squares(9, 64), &spec).unwrap();
        assert_eq!((plan.canvas_width, plan.canvas_height), (641, 359));
        assert_eq!(plan.placements.len(), 6);
        assert!(plan.fill);
        for placement in &plan.placements {
            assert!(placement.x + placement.width <= 641);
            assert!(placement.y + placement.height <= 359);
        }
    }

    #[test]
    fn fixed_canvas_without_room_fails() {
        let spec = LayoutSpec::grid()
            .with_columns(10)
            .with_padding(10)
            .with_fixed_canvas(100, 100);
        assert!(matches!(
            plan_grid(&squares(3, 10), &spec),
            Err(MoviePrintError::CompositionFailed(_))
        ));
    }

    #[test]
    fn header_shifts_cells_down() {
        let spec = LayoutSpec::grid()
            .with_columns(2)
            .with_padding(0)
            .with_header(30, "clip.mp4");
        let plan = plan_grid(&squares(2, 10), &spec).unwrap();
        assert_eq!(plan.placements[0].y, 30);
        assert_eq!(plan.canvas_height, 40);
    }

    #[test]
    fn no_images_is_reported() {
        assert!(matches!(
            plan_grid(&[], &LayoutSpec::grid()),
            Err(MoviePrintError::NoPlaceableImages)
        ));
    }
}
