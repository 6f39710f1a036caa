//! Sampled frames and placed thumbnails.
//!
//! A [`FrameRecord`] is produced by an extractor and describes one decoded
//! image on disk. A [`LayoutItem`] is produced by a compositor and describes
//! where that image ended up on the print.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Frame span of one detected shot.
///
/// `end_frame` is exclusive, so `duration_frames == end_frame - start_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShotSpan {
    /// First frame of the shot.
    pub start_frame: u64,
    /// First frame after the shot.
    pub end_frame: u64,
    /// Number of frames in the shot.
    pub duration_frames: u64,
}

impl ShotSpan {
    /// Build a span from its boundaries. Returns `None` for empty spans.
    pub fn new(start_frame: u64, end_frame: u64) -> Option<Self> {
        (end_frame > start_frame).then_some(Self {
            start_frame,
            end_frame,
            duration_frames: end_frame - start_frame,
        })
    }
}

/// One sampled frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// File name of the source video.
    pub video_filename: String,
    /// Absolute frame index in the source video.
    pub frame_number: u64,
    /// Timestamp in seconds, rounded to milliseconds.
    pub timestamp_sec: f64,
    /// Decoded image on local storage.
    pub path: PathBuf,
    /// Shot span, for records produced by shot detection.
    pub shot: Option<ShotSpan>,
    /// 1-based shot number, matching the `shot_NNNN` file name. Stays put
    /// when an earlier shot could not be read.
    pub shot_number: Option<usize>,
    /// Set when rotating the file in place failed.
    pub rotation_error: Option<String>,
}

impl FrameRecord {
    /// Create a record for an interval-mode frame.
    pub fn new(
        video_filename: impl Into<String>,
        frame_number: u64,
        timestamp_sec: f64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video_filename: video_filename.into(),
            frame_number,
            timestamp_sec: crate::conversion::round_millis(timestamp_sec),
            path: path.into(),
            shot: None,
            shot_number: None,
            rotation_error: None,
        }
    }

    /// Attach a shot span.
    #[must_use]
    pub fn with_shot(mut self, shot: ShotSpan) -> Self {
        self.shot = Some(shot);
        self
    }

    /// Attach the 1-based shot number.
    #[must_use]
    pub fn with_shot_number(mut self, number: usize) -> Self {
        self.shot_number = Some(number);
        self
    }

    /// Weight used by the timeline layout: the shot length in frames, or 1
    /// for interval frames.
    pub fn weight(&self) -> f64 {
        self.shot.map_or(1.0, |shot| shot.duration_frames as f64)
    }
}

/// Interval-mode file name: `frame_{seq:05}_absFN{frame}.{ext}`.
pub fn interval_frame_name(sequence: usize, frame_number: u64, extension: &str) -> String {
    format!("frame_{sequence:05}_absFN{frame_number}.{extension}")
}

/// Shot-mode file name: `shot_{seq:04}_absFN{frame}.{ext}` with a 1-based
/// sequence.
pub fn shot_frame_name(sequence: usize, frame_number: u64, extension: &str) -> String {
    format!("shot_{sequence:04}_absFN{frame_number}.{extension}")
}

/// One placed thumbnail on a composed print.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutItem {
    /// Image that was placed.
    #[serde(skip)]
    pub path: PathBuf,
    /// Left edge in canvas pixels.
    pub x: u32,
    /// Top edge in canvas pixels.
    pub y: u32,
    /// Rendered width.
    pub width: u32,
    /// Rendered height.
    pub height: u32,
}

impl LayoutItem {
    pub(crate) fn new(path: &Path, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the canvas point `(x, y)` lies inside this item.
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Scale position and size by `factor`, as done when the encoded print is
    /// downscaled to meet a size cap.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |value: u32| (value as f64 * factor).floor() as u32;
        Self {
            path: self.path.clone(),
            x: scale(self.x),
            y: scale(self.y),
            width: scale(self.width).max(1),
            height: scale(self.height).max(1),
        }
    }
}

/// Map a pointer position on the print back to the index of the item under
/// it, for interactive re-sampling.
pub fn locate(items: &[LayoutItem], x: u32, y: u32) -> Option<usize> {
    items.iter().position(|item| item.contains(x, y))
}
