//! JSON metadata written next to each print.
//!
//! The sidecar records what was extracted, with which parameters, and where
//! every thumbnail sits on the print, so a viewer can map a click back to a
//! source frame without re-running anything.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    configuration::{ExtractionSpec, LayoutSpec},
    error::MoviePrintError,
    extract::TimeWindow,
    finisher::write_atomic,
    frame::{FrameRecord, LayoutItem},
    timecode::format_timecode,
};

/// Parameters that produced a print.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationParameters {
    /// Effective extraction parameters.
    pub extraction: ExtractionSpec,
    /// Effective layout parameters.
    pub layout: LayoutSpec,
    /// Window after resolving against the video duration.
    pub window: Option<TimeWindow>,
    /// Down-sampling target, if any.
    pub max_frames_for_print: Option<usize>,
    /// Exclusion values that matched nothing.
    pub exclusion_warnings: Vec<String>,
    /// Number of thumbnails on the print.
    pub actual_frames_in_print: usize,
}

/// One thumbnail entry.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailEntry {
    /// Source video file name.
    pub video_filename: String,
    /// Absolute frame number.
    pub frame_number: u64,
    /// Timestamp in seconds.
    pub timestamp_sec: f64,
    /// Timestamp as `HH:MM:SS.mmm`.
    pub timecode: String,
    /// First frame of the shot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<u64>,
    /// First frame after the shot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<u64>,
    /// Shot length in frames.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_frames: Option<u64>,
    /// Why rotating the frame failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation_error: Option<String>,
    /// Placement on the print.
    pub layout_in_movieprint: LayoutItem,
}

impl ThumbnailEntry {
    fn new(record: &FrameRecord, item: &LayoutItem) -> Self {
        Self {
            video_filename: record.video_filename.clone(),
            frame_number: record.frame_number,
            timestamp_sec: record.timestamp_sec,
            timecode: format_timecode(record.timestamp_sec),
            start_frame: record.shot.map(|shot| shot.start_frame),
            end_frame: record.shot.map(|shot| shot.end_frame),
            duration_frames: record.shot.map(|shot| shot.duration_frames),
            rotation_error: record.rotation_error.clone(),
            layout_in_movieprint: item.clone(),
        }
    }
}

/// Complete sidecar document.
#[derive(Debug, Clone, Serialize)]
pub struct Sidecar {
    /// File name of the print.
    pub movieprint_image_filename: String,
    /// Absolute path of the source video.
    pub source_video_processed: PathBuf,
    /// Parameters that produced the print.
    pub generation_parameters: GenerationParameters,
    /// One entry per placed thumbnail, in layout order.
    pub thumbnails: Vec<ThumbnailEntry>,
}

impl Sidecar {
    /// Assemble a sidecar by matching layout items to records by file path.
    ///
    /// Items whose path matches no record are left out.
    pub fn new(
        print_path: &Path,
        video_path: &Path,
        mut parameters: GenerationParameters,
        records: &[FrameRecord],
        items: &[LayoutItem],
    ) -> Self {
        let thumbnails: Vec<ThumbnailEntry> = items
            .iter()
            .filter_map(|item| {
                records
                    .iter()
                    .find(|record| record.path == item.path)
                    .map(|record| ThumbnailEntry::new(record, item))
            })
            .collect();
        parameters.actual_frames_in_print = thumbnails.len();

        Self {
            movieprint_image_filename: print_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            source_video_processed: std::fs::canonicalize(video_path)
                .unwrap_or_else(|_| video_path.to_path_buf()),
            generation_parameters: parameters,
            thumbnails,
        }
    }

    /// `<print stem>.json` next to the print.
    pub fn path_for(print_path: &Path) -> PathBuf {
        print_path.with_extension("json")
    }

    /// Serialise as pretty-printed JSON and write it atomically.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::JsonError`] or
    /// [`MoviePrintError::CompositionFailed`] when the file cannot be
    /// written.
    pub fn write(&self, path: &Path) -> Result<(), MoviePrintError> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(&bytes, path)?;
        log::debug!("Wrote sidecar {}", path.display());
        Ok(())
    }
}
