//! Extraction and layout configuration.
//!
//! [`ExtractionSpec`] and [`LayoutSpec`] are immutable value types that
//! govern one pipeline invocation. Both are assembled with `with_*` setters
//! and checked by `build()`, so malformed parameters are rejected before any
//! file is opened.
//!
//! # Example
//!
//! ```
//! use movieprint::{ExtractionSpec, LayoutSpec, OutputFormat};
//!
//! let extraction = ExtractionSpec::interval_seconds(2.0)
//!     .with_window(Some(10.0), Some(70.0))
//!     .with_output_format(OutputFormat::Png)
//!     .build()
//!     .unwrap();
//!
//! let layout = LayoutSpec::grid()
//!     .with_columns(4)
//!     .with_padding(5)
//!     .build()
//!     .unwrap();
//! # let _ = (extraction, layout);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use image::Rgba;
use serde::{Serialize, Serializer};

use crate::{error::MoviePrintError, hardware::HardwareAccelerationMode};

/// Default shot-detector threshold on the `scdet` 0–100 scale.
pub const DEFAULT_SHOT_THRESHOLD: f64 = 10.0;

/// How frames are chosen from the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Fixed time or frame cadence.
    Interval,
    /// First frame of every detected shot.
    Shot,
}

/// The effective interval-mode cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    /// One frame every N seconds.
    Seconds(f64),
    /// One frame every N frames.
    Frames(u64),
}

/// Image format of extracted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (`.jpg`).
    #[default]
    Jpg,
    /// PNG (`.png`).
    Png,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    /// Parse `jpg`, `jpeg`, or `png` (case-insensitive, leading dot allowed).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(OutputFormat::Jpg),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::parse)
    }
}

/// Parameters governing one extraction call.
///
/// Exactly one of the interval seconds, interval frames, or shot threshold is
/// effective, determined by [`mode`](ExtractionSpec::mode). When both
/// interval fields are set, seconds take precedence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct ExtractionSpec {
    /// Extraction mode.
    pub mode: ExtractionMode,
    /// Interval in seconds (interval mode).
    pub interval_seconds: Option<f64>,
    /// Interval in frames (interval mode).
    pub interval_frames: Option<u64>,
    /// Shot-detector threshold (shot mode), 0–100.
    pub shot_threshold: Option<f64>,
    /// Inclusive window start in seconds. `None` means the beginning.
    pub start_time_sec: Option<f64>,
    /// Exclusive window end in seconds. `None` means the end of the video.
    pub end_time_sec: Option<f64>,
    /// Image format written for each frame.
    pub output_format: OutputFormat,
    /// Hardware decoding preference for the external transcoder.
    pub hardware: HardwareAccelerationMode,
}

impl ExtractionSpec {
    fn with_mode(mode: ExtractionMode) -> Self {
        Self {
            mode,
            interval_seconds: None,
            interval_frames: None,
            shot_threshold: None,
            start_time_sec: None,
            end_time_sec: None,
            output_format: OutputFormat::default(),
            hardware: HardwareAccelerationMode::Software,
        }
    }

    /// Interval mode, one frame every `seconds`.
    pub fn interval_seconds(seconds: f64) -> Self {
        Self::with_mode(ExtractionMode::Interval).with_interval_seconds(seconds)
    }

    /// Interval mode, one frame every `frames` frames.
    pub fn interval_frames(frames: u64) -> Self {
        Self::with_mode(ExtractionMode::Interval).with_interval_frames(frames)
    }

    /// Shot mode with the given detector threshold.
    pub fn shots(threshold: f64) -> Self {
        let mut spec = Self::with_mode(ExtractionMode::Shot);
        spec.shot_threshold = Some(threshold);
        spec
    }

    /// Set the interval in seconds.
    pub fn with_interval_seconds(mut self, seconds: f64) -> Self {
        self.interval_seconds = Some(seconds);
        self
    }

    /// Set the interval in frames.
    pub fn with_interval_frames(mut self, frames: u64) -> Self {
        self.interval_frames = Some(frames);
        self
    }

    /// Restrict extraction to `[start, end)`.
    pub fn with_window(mut self, start: Option<f64>, end: Option<f64>) -> Self {
        self.start_time_sec = start;
        self.end_time_sec = end;
        self
    }

    /// Set the frame image format.
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Request hardware-accelerated decoding in the external transcoder.
    pub fn with_hardware(mut self, mode: HardwareAccelerationMode) -> Self {
        self.hardware = mode;
        self
    }

    /// Validate and freeze the spec.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::InvalidParameters`] for a non-positive or
    /// missing interval, options that belong to the other mode, a threshold
    /// outside `0..=100`, or a window with `start >= end`.
    pub fn build(self) -> Result<Self, MoviePrintError> {
        self.validate()?;
        if self.interval_seconds.is_some() && self.interval_frames.is_some() {
            log::warn!("Both interval seconds and frames given; using seconds");
        }
        Ok(self)
    }

    /// Check the invariants without consuming the spec.
    pub fn validate(&self) -> Result<(), MoviePrintError> {
        let invalid = |message: String| Err(MoviePrintError::InvalidParameters(message));

        match self.mode {
            ExtractionMode::Interval => {
                if self.shot_threshold.is_some() {
                    return invalid("a shot threshold only applies to shot mode".into());
                }
                match (self.interval_seconds, self.interval_frames) {
                    (None, None) => {
                        return invalid(
                            "interval mode needs an interval in seconds or frames".into(),
                        );
                    }
                    (Some(seconds), _) if !(seconds.is_finite() && seconds > 0.0) => {
                        return invalid(format!("interval must be positive, got {seconds}s"));
                    }
                    (None, Some(0)) => return invalid("interval must be at least 1 frame".into()),
                    _ => {}
                }
            }
            ExtractionMode::Shot => {
                if self.interval_seconds.is_some() || self.interval_frames.is_some() {
                    return invalid("intervals only apply to interval mode".into());
                }
                let threshold = self.shot_threshold();
                if !(threshold.is_finite() && threshold > 0.0 && threshold <= 100.0) {
                    return invalid(format!("shot threshold must be in (0, 100], got {threshold}"));
                }
            }
        }

        if let Some(start) = self.start_time_sec
            && !(start.is_finite() && start >= 0.0)
        {
            return invalid(format!("start time must be non-negative, got {start}"));
        }
        if let Some(end) = self.end_time_sec {
            let start = self.start_time_sec.unwrap_or(0.0);
            if !end.is_finite() || end <= start {
                return invalid(format!(
                    "end time ({end:.3}s) must be after start time ({start:.3}s)"
                ));
            }
        }

        Ok(())
    }

    /// The effective interval cadence, or `None` in shot mode.
    pub fn cadence(&self) -> Option<Cadence> {
        if self.mode != ExtractionMode::Interval {
            return None;
        }
        self.interval_seconds
            .map(Cadence::Seconds)
            .or(self.interval_frames.map(Cadence::Frames))
    }

    /// The effective shot threshold.
    pub fn shot_threshold(&self) -> f64 {
        self.shot_threshold.unwrap_or(DEFAULT_SHOT_THRESHOLD)
    }
}

/// Composition discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutMode {
    /// Rectangular grid.
    Grid,
    /// Variable-width rows weighted by shot length.
    Timeline,
}

/// Clockwise rotation applied to every thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// No rotation.
    #[default]
    None,
    /// 90° clockwise.
    Clockwise90,
    /// 180°.
    Clockwise180,
    /// 270° clockwise.
    Clockwise270,
}

impl Rotation {
    /// Parse 0, 90, 180, or 270 degrees.
    pub fn from_degrees(degrees: u32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::None),
            90 => Some(Rotation::Clockwise90),
            180 => Some(Rotation::Clockwise180),
            270 => Some(Rotation::Clockwise270),
            _ => None,
        }
    }

    /// Rotation in degrees.
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Clockwise90 => 90,
            Rotation::Clockwise180 => 180,
            Rotation::Clockwise270 => 270,
        }
    }
}

impl Serialize for Rotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.degrees())
    }
}

/// An RGBA colour, written as `#RRGGBB` or `#RRGGBBAA`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    /// Opaque white.
    pub const WHITE: Color = Color([255, 255, 255, 255]);
    /// Opaque black.
    pub const BLACK: Color = Color([0, 0, 0, 255]);

    /// Parse `#RGB`, `#RRGGBB`, or `#RRGGBBAA` (the `#` is optional).
    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).ok();
        match hex.len() {
            3 => {
                let mut rgba = [255; 4];
                for (slot, digit) in rgba.iter_mut().zip(hex.chars()) {
                    let nibble = digit.to_digit(16)? as u8;
                    *slot = nibble * 17;
                }
                Some(Color(rgba))
            }
            6 => Some(Color([channel(0)?, channel(2)?, channel(4)?, 255])),
            8 => Some(Color([channel(0)?, channel(2)?, channel(4)?, channel(6)?])),
            _ => None,
        }
    }

    /// As an `image` pixel.
    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba(self.0)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a thumbnail label shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelContent {
    /// `HH:MM:SS` of the frame.
    #[default]
    Timecode,
    /// Absolute frame number.
    FrameNumber,
}

/// Corner a label is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPosition {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    #[default]
    BottomRight,
}

impl LabelPosition {
    /// Parse `top-left`, `top_right`, `bottomleft`, ...
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "topleft" => Some(LabelPosition::TopLeft),
            "topright" => Some(LabelPosition::TopRight),
            "bottomleft" => Some(LabelPosition::BottomLeft),
            "bottomright" => Some(LabelPosition::BottomRight),
            _ => None,
        }
    }
}

/// Per-thumbnail label appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct LabelStyle {
    /// Text shown.
    pub content: LabelContent,
    /// Anchor corner.
    pub position: LabelPosition,
    /// Glyph colour.
    pub text_color: Color,
    /// Fill of the box behind the text.
    pub background: Color,
    /// Integer pixel scale of the 5×7 glyphs.
    pub scale: u32,
    /// Gap between the text and the box edge, and between the box and the
    /// thumbnail edge.
    pub margin: u32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            content: LabelContent::Timecode,
            position: LabelPosition::BottomRight,
            text_color: Color::WHITE,
            background: Color([0, 0, 0, 160]),
            scale: 2,
            margin: 3,
        }
    }
}

impl LabelStyle {
    /// Set the label content.
    pub fn with_content(mut self, content: LabelContent) -> Self {
        self.content = content;
        self
    }

    /// Set the anchor corner.
    pub fn with_position(mut self, position: LabelPosition) -> Self {
        self.position = position;
        self
    }

    /// Set the text and box colours.
    pub fn with_colors(mut self, text: Color, background: Color) -> Self {
        self.text_color = text;
        self.background = background;
        self
    }

    /// Set the glyph scale (clamped to at least 1).
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale.max(1);
        self
    }

    /// Set the margin.
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }
}

/// Parameters governing one composition call.
///
/// In grid mode `columns` takes priority over `rows` whenever both are
/// given; `rows` alone derives `columns = ceil(count / rows)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[must_use]
pub struct LayoutSpec {
    /// Layout discipline.
    pub mode: LayoutMode,
    /// Grid columns.
    pub columns: Option<u32>,
    /// Grid rows.
    pub rows: Option<u32>,
    /// Grid cell width for the dynamic canvas. `None` keeps the widest image.
    pub target_thumbnail_width: Option<u32>,
    /// Timeline row height.
    pub row_height: u32,
    /// Timeline canvas width.
    pub canvas_width: u32,
    /// Gap between thumbnails and around the grid.
    pub padding: u32,
    /// Outer border.
    pub margin: u32,
    /// Canvas fill.
    pub background: Color,
    /// Corner radius at a 480px-wide thumbnail; 0 disables rounding.
    pub corner_radius: u32,
    /// Rotation applied before resizing.
    pub rotation: Rotation,
    /// JPEG quality, 1–100.
    pub quality: u8,
    /// Grid only: force the canvas to exactly `output_width × output_height`.
    pub fit_to_output: bool,
    /// Fixed canvas width.
    pub output_width: Option<u32>,
    /// Fixed canvas height.
    pub output_height: Option<u32>,
    /// Per-thumbnail label, if any.
    pub label: Option<LabelStyle>,
    /// Height of the header band; 0 disables it.
    pub header_height: u32,
    /// Text drawn in the header band.
    pub header_text: Option<String>,
}

impl LayoutSpec {
    fn with_mode(mode: LayoutMode) -> Self {
        Self {
            mode,
            columns: None,
            rows: None,
            target_thumbnail_width: None,
            row_height: 100,
            canvas_width: 1200,
            padding: 5,
            margin: 0,
            background: Color::WHITE,
            corner_radius: 0,
            rotation: Rotation::None,
            quality: 92,
            fit_to_output: false,
            output_width: None,
            output_height: None,
            label: None,
            header_height: 0,
            header_text: None,
        }
    }

    /// Grid layout with 5 columns.
    pub fn grid() -> Self {
        Self::with_mode(LayoutMode::Grid).with_columns(5)
    }

    /// Timeline layout packing rows of `row_height` into `canvas_width`.
    pub fn timeline(canvas_width: u32, row_height: u32) -> Self {
        let mut spec = Self::with_mode(LayoutMode::Timeline);
        spec.canvas_width = canvas_width;
        spec.row_height = row_height;
        spec
    }

    /// Set the grid column count.
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Set the grid row count.
    pub fn with_rows(mut self, rows: u32) -> Self {
        self.rows = Some(rows);
        self
    }

    /// Replace both grid dimensions; `None` clears one.
    pub fn with_grid(mut self, columns: Option<u32>, rows: Option<u32>) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Set the dynamic-canvas cell width.
    pub fn with_thumbnail_width(mut self, width: u32) -> Self {
        self.target_thumbnail_width = Some(width);
        self
    }

    /// Set the padding.
    pub fn with_padding(mut self, padding: u32) -> Self {
        self.padding = padding;
        self
    }

    /// Set the margin.
    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    /// Set the background colour.
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    /// Set the corner radius.
    pub fn with_corner_radius(mut self, radius: u32) -> Self {
        self.corner_radius = radius;
        self
    }

    /// Set the rotation.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the JPEG quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Use a fixed canvas of exactly `width × height` (grid only).
    pub fn with_fixed_canvas(mut self, width: u32, height: u32) -> Self {
        self.fit_to_output = true;
        self.output_width = Some(width);
        self.output_height = Some(height);
        self
    }

    /// Draw a label on every thumbnail.
    pub fn with_label(mut self, label: LabelStyle) -> Self {
        self.label = Some(label);
        self
    }

    /// Reserve a header band of `height` pixels showing `text`.
    pub fn with_header(mut self, height: u32, text: impl Into<String>) -> Self {
        self.header_height = height;
        self.header_text = Some(text.into());
        self
    }

    /// Validate and freeze the spec.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::InvalidParameters`] for zero grid
    /// dimensions, a fixed canvas without both sizes, a timeline with no room
    /// for a thumbnail, or a quality outside `1..=100`.
    pub fn build(self) -> Result<Self, MoviePrintError> {
        self.validate()?;
        Ok(self)
    }

    /// Check the invariants without consuming the spec.
    pub fn validate(&self) -> Result<(), MoviePrintError> {
        let invalid = |message: &str| Err(MoviePrintError::InvalidParameters(message.into()));

        if !(1..=100).contains(&self.quality) {
            return invalid("quality must be between 1 and 100");
        }

        match self.mode {
            LayoutMode::Grid => {
                if self.columns.is_none() && self.rows.is_none() {
                    return invalid("grid layout needs columns or rows");
                }
                if self.columns == Some(0) || self.rows == Some(0) {
                    return invalid("grid columns and rows must be at least 1");
                }
                if self.target_thumbnail_width == Some(0) {
                    return invalid("thumbnail width must be at least 1");
                }
                if self.fit_to_output {
                    match (self.output_width, self.output_height) {
                        (Some(width), Some(height)) if width > 0 && height > 0 => {}
                        _ => return invalid("a fixed canvas needs a positive width and height"),
                    }
                }
            }
            LayoutMode::Timeline => {
                if self.fit_to_output {
                    return invalid("a fixed canvas only applies to grid layout");
                }
                if self.row_height == 0 {
                    return invalid("row height must be at least 1");
                }
                let reserved = 2 * self.margin + 2 * self.padding;
                if self.canvas_width <= reserved {
                    return invalid("canvas width leaves no room for thumbnails");
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_take_precedence_over_frames() {
        let spec = ExtractionSpec::interval_seconds(1.5)
            .with_interval_frames(10)
            .build()
            .unwrap();
        assert_eq!(spec.cadence(), Some(Cadence::Seconds(1.5)));
    }

    #[test]
    fn hex_colours() {
        assert_eq!(Color::parse_hex("#FFFFFF"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("000"), Some(Color::BLACK));
        assert_eq!(Color::parse_hex("#10203040"), Some(Color([16, 32, 48, 64])));
        assert_eq!(Color::parse_hex("#12345"), None);
        assert_eq!(Color::parse_hex("#GGGGGG"), None);
        assert_eq!(Color([1, 2, 3, 255]).to_string(), "#010203");
    }

    #[test]
    fn rotation_degrees() {
        assert_eq!(Rotation::from_degrees(270), Some(Rotation::Clockwise270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::Clockwise90.degrees(), 90);
    }

    #[test]
    fn label_positions_parse_loosely() {
        assert_eq!(LabelPosition::parse("top-left"), Some(LabelPosition::TopLeft));
        assert_eq!(LabelPosition::parse("Bottom_Right"), Some(LabelPosition::BottomRight));
        assert_eq!(LabelPosition::parse("middle"), None);
    }
}
