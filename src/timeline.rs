//! Timeline layout planning.
//!
//! Thumbnails share one row height, and each one's natural width is its
//! aspect ratio at that height. Items are packed greedily into rows on those
//! natural widths. A row's width is then shared out by weight (shot length):
//! every full row spans the canvas exactly, while the last row keeps its
//! natural total width unless it would overflow.

use crate::{
    configuration::{LayoutMode, LayoutSpec},
    error::MoviePrintError,
    grid::Placement,
};

/// One item to place: image size and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedSize {
    /// Image width.
    pub width: u32,
    /// Image height.
    pub height: u32,
    /// Relative weight; items with a non-positive weight are dropped.
    pub weight: f64,
}

/// A complete timeline plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePlan {
    /// Canvas width, as configured.
    pub canvas_width: u32,
    /// Canvas height, header included.
    pub canvas_height: u32,
    /// Number of rows.
    pub rows: u32,
    /// Placed items in reading order. Dropped inputs have no entry.
    pub placements: Vec<Placement>,
}

/// Split `target` pixels between items in proportion to `weights`; the
/// rounding remainder goes to the last item.
fn share_by_weight(weights: &[f64], target: u32) -> Vec<u32> {
    let total: f64 = weights.iter().sum();
    if weights.is_empty() || total <= 0.0 {
        return vec![target.max(1); weights.len()];
    }

    let mut widths: Vec<u32> = weights
        .iter()
        .map(|&weight| ((weight / total * target as f64).floor() as u32).max(1))
        .collect();
    let assigned: u32 = widths[..widths.len() - 1].iter().sum();
    if let Some(last) = widths.last_mut() {
        *last = target.saturating_sub(assigned).max(1);
    }
    widths
}

/// Plan a timeline for the given items.
///
/// # Errors
///
/// - [`MoviePrintError::NoPlaceableImages`] when no item has a positive
///   weight and a usable size.
/// - [`MoviePrintError::InvalidParameters`] when `spec` is not a valid
///   timeline spec.
pub fn plan_timeline(items: &[WeightedSize], spec: &LayoutSpec) -> Result<TimelinePlan, MoviePrintError> {
    if spec.mode != LayoutMode::Timeline {
        return Err(MoviePrintError::InvalidParameters(
            "timeline planning needs a timeline layout spec".to_string(),
        ));
    }
    spec.validate()?;

    let kept: Vec<(usize, &WeightedSize)> = items
        .iter()
        .enumerate()
        .filter(|(index, item)| {
            let usable = item.weight.is_finite() && item.weight > 0.0 && item.width > 0 && item.height > 0;
            if !usable {
                log::debug!("Timeline item {index} dropped (weight {}, size {}x{})", item.weight, item.width, item.height);
            }
            usable
        })
        .collect();
    if kept.is_empty() {
        return Err(MoviePrintError::NoPlaceableImages);
    }

    let row_height = spec.row_height;
    let natural: Vec<(usize, u32, f64)> = kept
        .iter()
        .map(|&(index, item)| {
            let aspect = item.width as f64 / item.height as f64;
            let width = (row_height as f64 * aspect).round() as u32;
            (index, width.max(1), item.weight)
        })
        .collect();

    let padding = spec.padding;
    let inner_width = spec.canvas_width - 2 * spec.margin;

    let mut rows: Vec<Vec<(usize, u32, f64)>> = Vec::new();
    let mut current: Vec<(usize, u32, f64)> = Vec::new();
    let mut running: u32 = 0;
    for (index, width, weight) in natural {
        let paddings = (current.len() as u32 + 2) * padding;
        if !current.is_empty() && running + width + paddings > inner_width {
            rows.push(std::mem::take(&mut current));
            running = 0;
        }
        running += width;
        current.push((index, width, weight));
    }
    rows.push(current);

    let row_count = rows.len();
    let mut placements = Vec::with_capacity(items.len());
    for (row_index, row) in rows.into_iter().enumerate() {
        let available = inner_width.saturating_sub((row.len() as u32 + 1) * padding);
        let natural_sum: u32 = row.iter().map(|&(_, width, _)| width).sum();
        let weights: Vec<f64> = row.iter().map(|&(_, _, weight)| weight).collect();
        let is_last = row_index + 1 == row_count;

        let target = if is_last { natural_sum.min(available) } else { available };
        let widths = share_by_weight(&weights, target);

        let y = spec.margin + spec.header_height + padding + row_index as u32 * (row_height + padding);
        let mut x = spec.margin + padding;
        for (&(index, _, _), width) in row.iter().zip(widths) {
            placements.push(Placement {
                index,
                x,
                y,
                width,
                height: row_height,
            });
            x += width + padding;
        }
    }

    let plan = TimelinePlan {
        canvas_width: spec.canvas_width,
        canvas_height: 2 * spec.margin
            + spec.header_height
            + padding
            + row_count as u32 * (row_height + padding),
        rows: row_count as u32,
        placements,
    };
    log::debug!(
        "Timeline: {} items in {} rows on a {}x{} canvas",
        plan.placements.len(),
        plan.rows,
        plan.canvas_width,
        plan.canvas_height
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(width: u32, height: u32, weight: f64) -> WeightedSize {
        WeightedSize { width, height, weight }
    }

    #[test]
    fn full_rows_span_the_canvas() {
        let spec = LayoutSpec::timeline(300, 50).with_padding(5).with_margin(10);
        let items: Vec<WeightedSize> = (0..9).map(|i| item(160, 90, 1.0 + (i % 3) as f64)).collect();
        let plan = plan_timeline(&items, &spec).unwrap();
        assert!(plan.rows > 1);

        for row in 0..plan.rows - 1 {
            let y = 10 + 5 + row * 55;
            let in_row: Vec<&Placement> = plan.placements.iter().filter(|p| p.y == y).collect();
            let total: u32 = in_row.iter().map(|p| p.width).sum();
            assert_eq!(total + (in_row.len() as u32 + 1) * 5, 300 - 20);
        }
        for placement in &plan.placements {
            assert!(placement.x + placement.width <= plan.canvas_width);
            assert!(placement.y + placement.height <= plan.canvas_height);
        }
    }

    #[test]
    fn last_row_keeps_natural_widths() {
        let spec = LayoutSpec::timeline(1000, 90).with_padding(0);
        let plan = plan_timeline(&[item(160, 90, 1.0), item(160, 90, 1.0)], &spec).unwrap();
        assert_eq!(plan.rows, 1);
        assert_eq!(plan.placements[0].width, 160);
        assert_eq!(plan.placements[1].x, 160);
    }

    #[test]
    fn weights_scale_natural_width() {
        let spec = LayoutSpec::timeline(1000, 100).with_padding(0);
        let plan = plan_timeline(&[item(100, 100, 1.0), item(100, 100, 3.0)], &spec).unwrap();
        assert_eq!(plan.placements[0].width, 50);
        assert_eq!(plan.placements[1].width, 150);
    }

    #[test]
    fn weights_do_not_change_row_breaks() {
        let spec = LayoutSpec::timeline(250, 90).with_padding(0);
        let plan = plan_timeline(&[item(160, 90, 1.0), item(160, 90, 1.0), item(160, 90, 10.0)], &spec).unwrap();
        assert_eq!(plan.rows, 3);
        let widths: Vec<u32> = plan.placements.iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![250, 250, 160]);
    }

    #[test]
    fn full_row_width_is_shared_by_weight() {
        let spec = LayoutSpec::timeline(250, 45).with_padding(0);
        let items = [item(80, 45, 1.0), item(80, 45, 1.0), item(80, 45, 3.0), item(80, 45, 1.0)];
        let plan = plan_timeline(&items, &spec).unwrap();
        assert_eq!(plan.rows, 2);
        let widths: Vec<u32> = plan.placements.iter().map(|p| p.width).collect();
        assert_eq!(widths, vec![50, 50, 150, 80]);
        assert_eq!(plan.placements[2].x, 100);
    }

    #[test]
    fn height_counts_rows_and_header() {
        let spec = LayoutSpec::timeline(100, 40)
            .with_padding(2)
            .with_header(20, "clip");
        let items = vec![item(80, 40, 1.0); 3];
        let plan = plan_timeline(&items, &spec).unwrap();
        assert_eq!(plan.rows, 3);
        assert_eq!(plan.canvas_height, 20 + 2 + 3 * 42);
        assert_eq!(plan.placements[0].y, 22);
    }

    #[test]
    fn oversized_single_item_is_shrunk() {
        let spec = LayoutSpec::timeline(100, 100).with_padding(5);
        let plan = plan_timeline(&[item(400, 100, 1.0)], &spec).unwrap();
        assert_eq!(plan.placements[0].width, 90);
    }

    #[test]
    fn non_positive_weights_are_dropped() {
        let spec = LayoutSpec::timeline(500, 50);
        let plan = plan_timeline(&[item(10, 10, 0.0), item(10, 10, 2.0), item(10, 10, -1.0)], &spec).unwrap();
        assert_eq!(plan.placements.len(), 1);
        assert_eq!(plan.placements[0].index, 1);

        assert!(matches!(
            plan_timeline(&[item(10, 10, 0.0)], &spec),
            Err(MoviePrintError::NoPlaceableImages)
        ));
    }
}
