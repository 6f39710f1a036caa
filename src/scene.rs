//! Shot boundary extraction.
//!
//! Runs FFmpeg's `scdet` filter over the time window, turns the detected
//! cuts into shot spans, and writes the first frame of every shot as its
//! representative thumbnail. The detector is compiled in with the `scene`
//! feature (on by default); without it, or when the linked FFmpeg lacks
//! `scdet`, shot extraction fails with
//! [`CapabilityMissing`](crate::MoviePrintError::CapabilityMissing). There
//! is no seek-based fallback for shot detection.

use crate::{
    error::MoviePrintError,
    extract::{ExtractionContext, TimeWindow},
    frame::{FrameRecord, ShotSpan, shot_frame_name},
    probe::VideoSource,
};

/// A detected cut.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotCut {
    /// First frame of the new shot.
    pub frame_number: u64,
    /// Timestamp of that frame in seconds.
    pub timestamp_sec: f64,
    /// `scdet` score, 0–100.
    pub score: f64,
}

/// Detects shots and extracts their first frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShotBoundaryExtractor;

impl ShotBoundaryExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        Self
    }

    /// Whether shot detection can run in this build.
    pub fn is_available() -> bool {
        #[cfg(feature = "scene")]
        {
            ffmpeg_next::init().is_ok() && ffmpeg_next::filter::find("scdet").is_some()
        }
        #[cfg(not(feature = "scene"))]
        {
            false
        }
    }

    /// Detect shots in the context's window and write one thumbnail per shot.
    ///
    /// # Errors
    ///
    /// - [`MoviePrintError::CapabilityMissing`] when detection is unavailable.
    /// - [`MoviePrintError::ExtractionFailed`] when the video cannot be opened
    ///   or the detector fails; partial shot lists are discarded.
    pub fn extract(
        &self,
        context: &ExtractionContext<'_>,
    ) -> Result<Vec<FrameRecord>, MoviePrintError> {
        if !Self::is_available() {
            return Err(MoviePrintError::CapabilityMissing(
                "shot detection needs FFmpeg's `scdet` filter and the `scene` feature".to_string(),
            ));
        }

        let failed = |reason: String| MoviePrintError::ExtractionFailed {
            video: context.video_path.to_path_buf(),
            reason,
        };

        let mut source =
            VideoSource::open(context.video_path).map_err(|error| failed(error.to_string()))?;
        let threshold = context.spec.shot_threshold();
        let frames_per_second = context.info.frames_per_second;

        log::info!(
            "{}: detecting shots (threshold {threshold}) over [{:.3}s, {:.3}s)",
            context.info.filename,
            context.window.start,
            context.window.end
        );

        let cuts = detect_cuts(&mut source, context.window, threshold)
            .map_err(|error| failed(format!("shot detector failed: {error}")))?;

        let window_start = crate::conversion::seconds_to_frame_number(
            context.window.start,
            frames_per_second,
        );
        let window_end =
            crate::conversion::seconds_to_frame_number(context.window.end, frames_per_second);
        let spans = build_spans(
            window_start,
            window_end,
            cuts.iter().map(|cut| cut.frame_number),
        );

        log::info!("{}: {} shots in window", context.info.filename, spans.len());

        let extension = context.spec.output_format.extension();
        let mut reader = source.reader();
        let mut records = Vec::with_capacity(spans.len());

        for (index, span) in spans.iter().enumerate() {
            let seconds = span.start_frame as f64 / frames_per_second;
            let decoded = match reader.decode_at(seconds) {
                Ok(Some(decoded)) => decoded,
                Ok(None) => {
                    log::warn!(
                        "{}: could not read frame {} for shot {}",
                        context.info.filename,
                        span.start_frame,
                        index + 1
                    );
                    continue;
                }
                Err(error) => {
                    log::warn!(
                        "{}: could not decode frame {} for shot {}: {error}",
                        context.info.filename,
                        span.start_frame,
                        index + 1
                    );
                    continue;
                }
            };

            let path = context
                .output_dir
                .join(shot_frame_name(index + 1, span.start_frame, extension));
            if let Err(error) = crate::finisher::save_frame_image(&decoded.image, &path) {
                log::warn!(
                    "{}: could not write shot {} to {}: {error}",
                    context.info.filename,
                    index + 1,
                    path.display()
                );
                continue;
            }

            records.push(
                FrameRecord::new(
                    context.info.filename.clone(),
                    span.start_frame,
                    seconds,
                    path,
                )
                .with_shot(*span)
                .with_shot_number(index + 1),
            );
        }

        Ok(records)
    }
}

/// Turn cut frames into shot spans covering `[window_start, window_end)`.
///
/// Cuts outside the window are ignored, duplicates collapse, and
/// zero-length spans are dropped.
pub(crate) fn build_spans(
    window_start: u64,
    window_end: u64,
    cuts: impl IntoIterator<Item = u64>,
) -> Vec<ShotSpan> {
    let mut boundaries: Vec<u64> = cuts
        .into_iter()
        .filter(|&cut| cut > window_start && cut < window_end)
        .collect();
    boundaries.sort_unstable();
    boundaries.dedup();

    let starts = std::iter::once(window_start).chain(boundaries.iter().copied());
    let ends = boundaries.iter().copied().chain(std::iter::once(window_end));
    starts
        .zip(ends)
        .filter_map(|(start, end)| ShotSpan::new(start, end))
        .collect()
}

#[cfg(feature = "scene")]
fn detect_cuts(
    source: &mut VideoSource,
    window: TimeWindow,
    threshold: f64,
) -> Result<Vec<ShotCut>, MoviePrintError> {
    detector::run(source, window, threshold)
}

#[cfg(not(feature = "scene"))]
fn detect_cuts(
    _source: &mut VideoSource,
    _window: TimeWindow,
    _threshold: f64,
) -> Result<Vec<ShotCut>, MoviePrintError> {
    Err(MoviePrintError::CapabilityMissing(
        "built without the `scene` feature".to_string(),
    ))
}

#[cfg(feature = "scene")]
mod detector {
    use std::ffi::CStr;

    use ffmpeg_next::{
        Rational, codec::context::Context as CodecContext, filter::Graph as FilterGraph,
        frame::Video as VideoFrame,
    };
    use ffmpeg_sys_next::AVPixelFormat;

    use super::ShotCut;
    use crate::{
        conversion::{pts_to_seconds, seconds_to_frame_number, seconds_to_seek_timestamp},
        error::MoviePrintError,
        extract::TimeWindow,
        probe::VideoSource,
    };

    fn graph_error(stage: &str, error: impl std::fmt::Display) -> MoviePrintError {
        MoviePrintError::FfmpegError(format!("Filter graph {stage}: {error}"))
    }

    /// Feeds decoded frames through `scdet` and keeps the cuts.
    struct CutCollector {
        graph: Option<FilterGraph>,
        filtered: VideoFrame,
        cuts: Vec<ShotCut>,
        time_base: Rational,
        start_offset: f64,
        frames_per_second: f64,
        threshold: f64,
    }

    impl CutCollector {
        fn push(&mut self, frame: &VideoFrame) -> Result<(), MoviePrintError> {
            if self.graph.is_none() {
                self.graph = Some(build_graph(frame, self.time_base, self.threshold)?);
            }
            if let Some(graph) = self.graph.as_mut() {
                graph
                    .get("in")
                    .ok_or_else(|| graph_error("input", "'in' not found"))?
                    .source()
                    .add(frame)
                    .map_err(|error| graph_error("feed", error))?;
            }
            self.drain()
        }

        fn finish(mut self) -> Result<Vec<ShotCut>, MoviePrintError> {
            if let Some(graph) = self.graph.as_mut() {
                graph
                    .get("in")
                    .ok_or_else(|| graph_error("input", "'in' not found"))?
                    .source()
                    .flush()
                    .map_err(|error| graph_error("flush", error))?;
            }
            self.drain()?;
            Ok(self.cuts)
        }

        fn drain(&mut self) -> Result<(), MoviePrintError> {
            let Some(graph) = self.graph.as_mut() else {
                return Ok(());
            };
            let mut sink = graph
                .get("out")
                .ok_or_else(|| graph_error("output", "'out' not found"))?;

            while sink.sink().frame(&mut self.filtered).is_ok() {
                let Some(score) = read_scdet_score(&self.filtered) else {
                    continue;
                };
                if score < self.threshold {
                    continue;
                }
                let pts = self.filtered.timestamp().or(self.filtered.pts()).unwrap_or(0);
                let timestamp_sec = (pts_to_seconds(pts, self.time_base) - self.start_offset).max(0.0);
                let frame_number = seconds_to_frame_number(timestamp_sec, self.frames_per_second);
                log::debug!("Cut at frame {frame_number} ({timestamp_sec:.3}s), score {score:.2}");
                self.cuts.push(ShotCut {
                    frame_number,
                    timestamp_sec,
                    score,
                });
            }
            Ok(())
        }
    }

    /// Build `buffer → scale → format → scdet → buffersink` matching the
    /// first decoded frame.
    ///
    /// The `format` stage normalises to YUV420P so that decoders switching
    /// pixel format mid-stream do not break the graph.
    fn build_graph(
        frame: &VideoFrame,
        time_base: Rational,
        threshold: f64,
    ) -> Result<FilterGraph, MoviePrintError> {
        let pix_fmt = AVPixelFormat::from(frame.format()) as i32;
        // SAFETY: reads two plain fields of a valid, decoded AVFrame. The safe
        // enum accessors do not round-trip every FFmpeg discriminant.
        let (color_space, color_range) = unsafe {
            let ptr = frame.as_ptr();
            ((*ptr).colorspace as i32, (*ptr).color_range as i32)
        };

        let mut graph = FilterGraph::new();
        let buffer_args = format!(
            "video_size={}x{}:pix_fmt={}:time_base={}/{}:pixel_aspect=1/1:colorspace={}:range={}",
            frame.width(),
            frame.height(),
            pix_fmt,
            time_base.numerator(),
            time_base.denominator(),
            color_space,
            color_range,
        );

        let buffer = ffmpeg_next::filter::find("buffer")
            .ok_or_else(|| graph_error("setup", "'buffer' filter not found"))?;
        let buffersink = ffmpeg_next::filter::find("buffersink")
            .ok_or_else(|| graph_error("setup", "'buffersink' filter not found"))?;

        graph
            .add(&buffer, "in", &buffer_args)
            .map_err(|error| graph_error("buffer", error))?;
        graph
            .add(&buffersink, "out", "")
            .map_err(|error| graph_error("buffersink", error))?;

        let chain = format!("scale=320:-2,format=pix_fmts=yuv420p,scdet=threshold={threshold}");
        graph
            .output("in", 0)
            .map_err(|error| graph_error("output", error))?
            .input("out", 0)
            .map_err(|error| graph_error("input", error))?
            .parse(&chain)
            .map_err(|error| graph_error("parse", error))?;
        graph
            .validate()
            .map_err(|error| graph_error("validation", error))?;

        Ok(graph)
    }

    /// Decode `[window.start, window.end)` and return the detected cuts.
    pub(super) fn run(
        source: &mut VideoSource,
        window: TimeWindow,
        threshold: f64,
    ) -> Result<Vec<ShotCut>, MoviePrintError> {
        let stream_index = source.stream_index;
        let frames_per_second = source.info.frames_per_second;
        let start_offset = source.info.start_offset_sec;

        let stream = source
            .input_context
            .stream(stream_index)
            .ok_or(MoviePrintError::NoVideoStream)?;
        let time_base = stream.time_base();
        let mut decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let seek_target = seconds_to_seek_timestamp(window.start + start_offset);
        source.input_context.seek(seek_target, ..seek_target)?;

        let half_frame = 0.5 / frames_per_second;
        let position = |frame: &VideoFrame| {
            frame
                .timestamp()
                .or(frame.pts())
                .map(|pts| pts_to_seconds(pts, time_base) - start_offset)
        };

        let mut collector = CutCollector {
            graph: None,
            filtered: VideoFrame::empty(),
            cuts: Vec::new(),
            time_base,
            start_offset,
            frames_per_second,
            threshold,
        };
        let mut decoded = VideoFrame::empty();
        let mut reached_end = false;

        'packets: for (stream, packet) in source.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }

            decoder
                .send_packet(&packet)
                .map_err(|error| MoviePrintError::FfmpegError(error.to_string()))?;

            while decoder.receive_frame(&mut decoded).is_ok() {
                let Some(seconds) = position(&decoded) else {
                    continue;
                };
                if seconds < window.start - half_frame {
                    continue;
                }
                if seconds >= window.end - half_frame {
                    reached_end = true;
                    break 'packets;
                }
                collector.push(&decoded)?;
            }
        }

        if !reached_end {
            decoder.send_eof()?;
            while decoder.receive_frame(&mut decoded).is_ok() {
                let Some(seconds) = position(&decoded) else {
                    continue;
                };
                if seconds >= window.end - half_frame {
                    break;
                }
                if seconds >= window.start - half_frame {
                    collector.push(&decoded)?;
                }
            }
        }

        collector.finish()
    }

    /// Read the `lavfi.scd.score` metadata value from a filtered frame.
    fn read_scdet_score(frame: &VideoFrame) -> Option<f64> {
        // SAFETY: per-frame metadata is not exposed by ffmpeg-next's safe API;
        // the dictionary and entry pointers are checked before use.
        unsafe {
            let frame_ptr = frame.as_ptr();
            if frame_ptr.is_null() {
                return None;
            }

            let metadata = (*frame_ptr).metadata;
            if metadata.is_null() {
                return None;
            }

            let entry =
                ffmpeg_sys_next::av_dict_get(metadata, c"lavfi.scd.score".as_ptr(), std::ptr::null(), 0);
            if entry.is_null() || (*entry).value.is_null() {
                return None;
            }

            CStr::from_ptr((*entry).value).to_str().ok()?.parse::<f64>().ok()
        }
    }
}
