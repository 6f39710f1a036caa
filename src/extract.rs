//! Frame extraction.
//!
//! [`extract`] is the entry point for both modes. Interval mode walks an
//! ordered list of [`ExtractionStrategy`] values (external transcoder on the
//! GPU, external transcoder on the CPU, then frame-accurate seeking) and
//! returns the first non-empty result. Shot mode hands over to
//! [`ShotBoundaryExtractor`](crate::ShotBoundaryExtractor), which has no
//! fallback.
//!
//! # Example
//!
//! ```no_run
//! use movieprint::{ExtractionSpec, extract};
//!
//! let spec = ExtractionSpec::interval_seconds(5.0).build()?;
//! let records = extract("input.mp4", "frames/", &spec)?;
//! for record in &records {
//!     println!("{} @ {:.3}s -> {}", record.frame_number, record.timestamp_sec, record.path.display());
//! }
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```

use std::{fs, path::Path};

use serde::Serialize;

use crate::{
    configuration::{Cadence, ExtractionMode, ExtractionSpec},
    error::MoviePrintError,
    frame::{FrameRecord, interval_frame_name},
    hardware::{available_hardware_devices, resolve_hwaccel},
    probe::{VideoInfo, VideoSource},
    transcoder::{FfmpegTool, TranscoderStrategy},
};

/// The resolved half-open extraction window `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    /// Inclusive start.
    pub start: f64,
    /// Exclusive end.
    pub end: f64,
}

impl TimeWindow {
    /// Resolve the spec's window against the video duration.
    ///
    /// An omitted end means the full duration; an end past the duration is
    /// clamped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::InvalidParameters`] when the start lies at
    /// or beyond the end of the video.
    pub fn resolve(spec: &ExtractionSpec, info: &VideoInfo) -> Result<Self, MoviePrintError> {
        let start = spec.start_time_sec.unwrap_or(0.0);
        let duration = info.duration_sec;

        if start >= duration {
            return Err(MoviePrintError::InvalidParameters(format!(
                "start time ({start:.2}s) is beyond the duration of {} ({duration:.2}s)",
                info.filename
            )));
        }

        let end = match spec.end_time_sec {
            Some(end) if end > duration => {
                log::warn!(
                    "End time ({end:.2}s) exceeds the duration of {} ({duration:.2}s); clamping",
                    info.filename
                );
                duration
            }
            Some(end) => end,
            None => duration,
        };

        Ok(Self { start, end })
    }

    /// Whether `seconds` lies inside the window.
    pub fn contains(&self, seconds: f64) -> bool {
        seconds >= self.start && seconds < self.end
    }
}

/// Everything a strategy needs for one extraction call.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionContext<'a> {
    /// Video being extracted.
    pub video_path: &'a Path,
    /// Directory receiving the frame images.
    pub output_dir: &'a Path,
    /// Validated parameters.
    pub spec: &'a ExtractionSpec,
    /// Probed numbers for the video.
    pub info: &'a VideoInfo,
    /// Resolved time window.
    pub window: TimeWindow,
}

/// One way of producing interval-mode frames.
///
/// Strategies are tried in order; an error or an empty result moves on to
/// the next one.
pub trait ExtractionStrategy {
    /// Short name used in log lines.
    fn name(&self) -> String;

    /// Produce frames for the context, writing one image per frame into
    /// `context.output_dir`.
    fn extract(&self, context: &ExtractionContext<'_>) -> Result<Vec<FrameRecord>, MoviePrintError>;
}

/// Frame-accurate seeking through the linked FFmpeg libraries.
///
/// Seeks to each cadence point, decodes one frame, and stops at the end of
/// the window or the stream. Frames that fail to decode or write are logged
/// and skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekStrategy;

impl ExtractionStrategy for SeekStrategy {
    fn name(&self) -> String {
        "seek".to_string()
    }

    fn extract(&self, context: &ExtractionContext<'_>) -> Result<Vec<FrameRecord>, MoviePrintError> {
        let mut source = VideoSource::open(context.video_path)?;
        let frames_per_second = context.info.frames_per_second;
        let extension = context.spec.output_format.extension();
        let window = context.window;

        let step = match context.spec.cadence() {
            Some(Cadence::Seconds(seconds)) => seconds,
            Some(Cadence::Frames(frames)) => frames as f64 / frames_per_second,
            None => {
                return Err(MoviePrintError::InvalidParameters(
                    "seek extraction needs an interval".to_string(),
                ));
            }
        };

        let mut records = Vec::new();
        let mut reader = source.reader();
        let mut index: u64 = 0;

        loop {
            let next_time = window.start + index as f64 * step;
            index += 1;
            if !window.contains(next_time) {
                break;
            }

            let decoded = match reader.decode_at(next_time) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => {
                    log::debug!(
                        "{}: stream ended before {next_time:.3}s",
                        context.info.filename
                    );
                    break;
                }
                Err(error) => {
                    log::warn!(
                        "{}: skipping frame at {next_time:.3}s: {error}",
                        context.info.filename
                    );
                    continue;
                }
            };

            if decoded.timestamp_sec >= window.end {
                break;
            }
            if records
                .last()
                .is_some_and(|last: &FrameRecord| last.frame_number >= decoded.frame_number)
            {
                continue;
            }

            let path = context.output_dir.join(interval_frame_name(
                records.len(),
                decoded.frame_number,
                extension,
            ));
            if let Err(error) = crate::finisher::save_frame_image(&decoded.image, &path) {
                log::warn!(
                    "{}: could not write frame {} to {}: {error}",
                    context.info.filename,
                    decoded.frame_number,
                    path.display()
                );
                continue;
            }

            log::debug!(
                "{}: frame {} ({:.3}s) -> {}",
                context.info.filename,
                decoded.frame_number,
                decoded.timestamp_sec,
                path.display()
            );
            records.push(FrameRecord::new(
                context.info.filename.clone(),
                decoded.frame_number,
                decoded.timestamp_sec,
                path,
            ));
        }

        Ok(records)
    }
}

/// Interval-mode orchestrator over an ordered strategy list.
pub struct IntervalExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl IntervalExtractor {
    /// Use an explicit strategy list, tried in order.
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The default chain for a spec: `ffmpeg` on the GPU (when requested and
    /// available), `ffmpeg` on the CPU (when the tool exists), then seeking.
    pub fn for_spec(spec: &ExtractionSpec) -> Self {
        let mut strategies: Vec<Box<dyn ExtractionStrategy>> = Vec::new();

        match FfmpegTool::locate() {
            Ok(tool) => {
                if spec.hardware.is_requested() {
                    let devices = available_hardware_devices(tool.program());
                    match resolve_hwaccel(spec.hardware, &devices) {
                        Some(hwaccel) => {
                            strategies.push(Box::new(TranscoderStrategy::gpu(tool.clone(), hwaccel)))
                        }
                        None => log::info!(
                            "Hardware decoding requested but unavailable ({:?}); using CPU",
                            spec.hardware
                        ),
                    }
                }
                strategies.push(Box::new(TranscoderStrategy::cpu(tool)));
            }
            Err(error) => log::warn!("{error}; falling back to frame seeking"),
        }

        strategies.push(Box::new(SeekStrategy));
        Self { strategies }
    }

    /// Names of the strategies in priority order.
    pub fn strategy_names(&self) -> Vec<String> {
        self.strategies.iter().map(|strategy| strategy.name()).collect()
    }

    /// Run the chain and return the first non-empty result.
    ///
    /// Returns an empty list when every strategy came up empty, and the last
    /// error when every strategy failed.
    pub fn run(&self, context: &ExtractionContext<'_>) -> Result<Vec<FrameRecord>, MoviePrintError> {
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.extract(context) {
                Ok(records) if !records.is_empty() => {
                    log::info!(
                        "{}: extracted {} frames with {}",
                        context.info.filename,
                        records.len(),
                        strategy.name()
                    );
                    return Ok(records);
                }
                Ok(_) => {
                    log::warn!(
                        "{}: {} produced no frames; trying next strategy",
                        context.info.filename,
                        strategy.name()
                    );
                    last_error = None;
                }
                Err(error) => {
                    log::warn!(
                        "{}: {} failed: {error}; trying next strategy",
                        context.info.filename,
                        strategy.name()
                    );
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(Vec::new()),
        }
    }
}

/// Extract frames from `video_path` into `output_dir`.
///
/// Creates `output_dir` if needed, probes the video, resolves the time
/// window, and dispatches on the spec's mode.
///
/// # Errors
///
/// - [`MoviePrintError::InvalidParameters`] for an invalid spec or window.
/// - [`MoviePrintError::ExtractionFailed`] when the video cannot be opened,
///   every interval strategy failed, or the shot detector failed.
/// - [`MoviePrintError::CapabilityMissing`] when shot detection is not
///   available.
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    output_dir: Q,
    spec: &ExtractionSpec,
) -> Result<Vec<FrameRecord>, MoviePrintError> {
    let video_path = video_path.as_ref();
    let output_dir = output_dir.as_ref();
    spec.validate()?;

    if !video_path.is_file() {
        return Err(MoviePrintError::ExtractionFailed {
            video: video_path.to_path_buf(),
            reason: "video file not found".to_string(),
        });
    }

    let info = crate::probe::VideoProbe::probe(video_path).map_err(|error| {
        MoviePrintError::ExtractionFailed {
            video: video_path.to_path_buf(),
            reason: error.to_string(),
        }
    })?;
    let window = TimeWindow::resolve(spec, &info)?;
    fs::create_dir_all(output_dir)?;

    log::info!(
        "{}: {:?} extraction over [{:.3}s, {:.3}s) ({:.3} fps)",
        info.filename,
        spec.mode,
        window.start,
        window.end,
        info.frames_per_second
    );

    let context = ExtractionContext {
        video_path,
        output_dir,
        spec,
        info: &info,
        window,
    };

    match spec.mode {
        ExtractionMode::Interval => IntervalExtractor::for_spec(spec)
            .run(&context)
            .map_err(|error| match error {
                MoviePrintError::ExtractionFailed { .. } => error,
                other => MoviePrintError::ExtractionFailed {
                    video: video_path.to_path_buf(),
                    reason: other.to_string(),
                },
            }),
        ExtractionMode::Shot => crate::scene::ShotBoundaryExtractor::new().extract(&context),
    }
}
