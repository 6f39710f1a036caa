//! Error types for the `movieprint` crate.
//!
//! This module defines [`MoviePrintError`], the unified error type returned by
//! every fallible operation in the pipeline. Variants carry the video path,
//! frame number, or upstream message needed to diagnose a failure from the
//! log alone.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

/// The unified error type for all `movieprint` operations.
///
/// Per-video errors ([`ExtractionFailed`](MoviePrintError::ExtractionFailed),
/// [`CompositionFailed`](MoviePrintError::CompositionFailed), ...) are
/// collected by [`run_batch`](crate::run_batch) instead of aborting the batch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MoviePrintError {
    /// An external tool (the `ffmpeg` executable) is missing or unusable.
    #[error("External tool '{tool}' is unavailable: {reason}")]
    ToolUnavailable {
        /// Name of the tool that was looked up.
        tool: String,
        /// Why it could not be used.
        reason: String,
    },

    /// A capability required by the requested mode is not compiled in or not
    /// provided by the linked FFmpeg build.
    #[error("Required capability is missing: {0}")]
    CapabilityMissing(String),

    /// A single frame could not be decoded or written.
    #[error("Failed to decode frame {frame_number} of {video}: {reason}")]
    DecodeFailure {
        /// Video the frame belongs to.
        video: PathBuf,
        /// Absolute frame number (or the target frame for time seeks).
        frame_number: u64,
        /// Underlying reason.
        reason: String,
    },

    /// The video could not be processed at all, or the shot detector failed.
    #[error("Extraction failed for {video}: {reason}")]
    ExtractionFailed {
        /// Video being extracted.
        video: PathBuf,
        /// Underlying reason.
        reason: String,
    },

    /// Composition failed: no usable images, canvas allocation, or output
    /// write failure.
    #[error("Composition failed: {0}")]
    CompositionFailed(String),

    /// Parameters were rejected before any I/O took place.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// No video file was found among the inputs.
    #[error("No video found in the given inputs")]
    NoVideoFound,

    /// Extraction succeeded but produced zero frames.
    #[error("Extraction produced zero frames for {video}")]
    NoFramesExtracted {
        /// Video that yielded nothing.
        video: PathBuf,
    },

    /// Every frame was excluded, unreadable, or had a non-positive weight.
    #[error("Composition produced zero placeable images")]
    NoPlaceableImages,

    /// The output path already exists.
    #[error("Output path already exists: {0}")]
    OutputExists(PathBuf),

    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`VideoSource::open`](crate::VideoSource::open).
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A timestamp lies outside the video.
    #[error("Invalid timestamp: {seconds:.3}s (video is {duration:.3}s long)")]
    InvalidTimestamp {
        /// Requested position in seconds.
        seconds: f64,
        /// Video duration in seconds.
        duration: f64,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while reading, transforming, or
    /// encoding an image.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),

    /// The sidecar metadata could not be serialised.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl MoviePrintError {
    /// Whether this error only affects a single frame and may be skipped.
    pub fn is_per_frame(&self) -> bool {
        matches!(self, MoviePrintError::DecodeFailure { .. })
    }
}

impl From<FfmpegError> for MoviePrintError {
    fn from(error: FfmpegError) -> Self {
        MoviePrintError::FfmpegError(error.to_string())
    }
}
