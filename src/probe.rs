//! Video probing.
//!
//! [`VideoSource`] opens a video through FFmpeg, locates the best video
//! stream, and caches the numbers every extractor needs: frame rate,
//! duration, and frame count. [`VideoProbe`] is the one-shot variant that
//! closes the demuxer straight away.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{codec::context::Context as CodecContext, format::context::Input, media::Type};
use serde::Serialize;

use crate::{error::MoviePrintError, video::SingleFrameReader};

/// Numbers reported for an opened video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    /// Path the video was opened from.
    pub path: PathBuf,
    /// File name component of `path`.
    pub filename: String,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frame rate.
    pub frames_per_second: f64,
    /// Duration in seconds.
    pub duration_sec: f64,
    /// Number of frames (reported by the container, or estimated).
    pub frame_count: u64,
    /// Decoder name.
    pub codec: String,
    /// Stream start time in seconds. Timestamps everywhere else in the crate
    /// are relative to it, so the first frame is at 0.
    pub start_offset_sec: f64,
}

/// An opened video, ready for frame reads.
pub struct VideoSource {
    /// The opened FFmpeg input (demuxer) context.
    pub(crate) input_context: Input,
    /// Index of the best video stream.
    pub(crate) stream_index: usize,
    /// Cached numbers.
    pub(crate) info: VideoInfo,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("stream_index", &self.stream_index)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the file, and locates the best
    /// video stream.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::FileOpen`] if the file cannot be opened or
    /// reports no usable frame rate, and [`MoviePrintError::NoVideoStream`]
    /// if it has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, MoviePrintError> {
        let path = path.as_ref();
        let open_error = |reason: String| MoviePrintError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        log::debug!("Opening video: {}", path.display());

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(MoviePrintError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let frame_rate = stream.avg_frame_rate();
        let frames_per_second = if frame_rate.denominator() != 0 && frame_rate.numerator() != 0 {
            frame_rate.numerator() as f64 / frame_rate.denominator() as f64
        } else {
            let rate = stream.rate();
            if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            }
        };
        if !(frames_per_second.is_finite() && frames_per_second > 0.0) {
            return Err(open_error("video reports no usable frame rate".to_string()));
        }

        let container_duration = input_context.duration();
        let duration_sec = if container_duration > 0 {
            container_duration as f64 / 1_000_000.0
        } else if stream.duration() > 0 {
            crate::conversion::pts_to_seconds(stream.duration(), time_base)
        } else {
            0.0
        };

        let frame_count = match stream.frames() {
            frames if frames > 0 => frames as u64,
            _ => (duration_sec * frames_per_second) as u64,
        };

        // AV_NOPTS_VALUE is i64::MIN, so only positive starts count.
        let start_offset_sec = match stream.start_time() {
            start if start > 0 => crate::conversion::pts_to_seconds(start, time_base),
            _ => 0.0,
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let info = VideoInfo {
            path: path.to_path_buf(),
            filename: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            duration_sec,
            frame_count,
            codec,
            start_offset_sec,
        };

        log::debug!(
            "{}: {}x{} @ {:.3} fps, {:.3}s, {} frames",
            info.filename,
            info.width,
            info.height,
            info.frames_per_second,
            info.duration_sec,
            info.frame_count
        );

        Ok(Self {
            input_context,
            stream_index,
            info,
        })
    }

    /// Cached numbers for this video.
    pub fn info(&self) -> &VideoInfo {
        &self.info
    }

    /// Borrow a reader that seeks and decodes single frames.
    pub fn reader(&mut self) -> SingleFrameReader<'_> {
        SingleFrameReader { source: self }
    }
}

/// One-shot probe that opens a video, reads its numbers, and closes it.
///
/// # Example
///
/// ```no_run
/// use movieprint::VideoProbe;
///
/// let info = VideoProbe::probe("input.mp4")?;
/// println!("{:.2} fps, {:.1}s", info.frames_per_second, info.duration_sec);
/// # Ok::<(), movieprint::MoviePrintError>(())
/// ```
pub struct VideoProbe;

impl VideoProbe {
    /// Probe a video and return its numbers.
    ///
    /// # Errors
    ///
    /// Same as [`VideoSource::open`].
    pub fn probe<P: AsRef<Path>>(path: P) -> Result<VideoInfo, MoviePrintError> {
        Ok(VideoSource::open(path)?.info)
    }
}
