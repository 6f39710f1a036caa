//! Single-frame seeking and decoding.
//!
//! [`SingleFrameReader`] seeks to an arbitrary timestamp and decodes exactly
//! one frame. It backs the seek-based interval fallback, shot thumbnails, and
//! interactive re-sampling through [`extract_one`].

use std::path::Path;

use ffmpeg_next::{
    codec::context::Context as CodecContext,
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::{DynamicImage, RgbImage};

use crate::{
    conversion::{pts_to_seconds, seconds_to_frame_number, seconds_to_seek_timestamp},
    error::MoviePrintError,
    probe::VideoSource,
};

/// A decoded frame and where it sits in the video.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Absolute frame number derived from the decoder position.
    pub frame_number: u64,
    /// Presentation time in seconds.
    pub timestamp_sec: f64,
    /// The frame as RGB8.
    pub image: DynamicImage,
}

/// Seeks and decodes single frames from a [`VideoSource`].
///
/// Obtained via [`VideoSource::reader`]. Each read builds a fresh decoder,
/// seeks to the keyframe at or before the target, and decodes forward to the
/// first frame at or after it.
pub struct SingleFrameReader<'a> {
    pub(crate) source: &'a mut VideoSource,
}

impl SingleFrameReader<'_> {
    /// Decode the frame shown at `seconds`.
    ///
    /// # Errors
    ///
    /// - [`MoviePrintError::InvalidTimestamp`] if `seconds` lies outside the
    ///   video.
    /// - [`MoviePrintError::DecodeFailure`] if no frame could be decoded at or
    ///   after the target.
    pub fn frame_at_time(&mut self, seconds: f64) -> Result<DecodedFrame, MoviePrintError> {
        let duration = self.source.info.duration_sec;
        if !(0.0..=duration).contains(&seconds) {
            return Err(MoviePrintError::InvalidTimestamp { seconds, duration });
        }

        let frames_per_second = self.source.info.frames_per_second;
        self.decode_at(seconds)?.ok_or_else(|| MoviePrintError::DecodeFailure {
            video: self.source.info.path.clone(),
            frame_number: seconds_to_frame_number(seconds, frames_per_second),
            reason: "no frame at or after the target (end of stream)".to_string(),
        })
    }

    /// Decode the frame with the given absolute frame number.
    ///
    /// # Errors
    ///
    /// Same as [`frame_at_time`](SingleFrameReader::frame_at_time).
    pub fn frame_at(&mut self, frame_number: u64) -> Result<DecodedFrame, MoviePrintError> {
        let seconds = frame_number as f64 / self.source.info.frames_per_second;
        self.frame_at_time(seconds.min(self.source.info.duration_sec))
    }

    /// Decode the first frame at or after `seconds`.
    ///
    /// Returns `Ok(None)` when the stream ends before such a frame appears.
    pub(crate) fn decode_at(
        &mut self,
        seconds: f64,
    ) -> Result<Option<DecodedFrame>, MoviePrintError> {
        let source = &mut *self.source;
        let stream_index = source.stream_index;
        let frames_per_second = source.info.frames_per_second;
        let start_offset = source.info.start_offset_sec;
        let target_frame = seconds_to_frame_number(seconds, frames_per_second);

        let stream = source
            .input_context
            .stream(stream_index)
            .ok_or(MoviePrintError::NoVideoStream)?;
        let time_base = stream.time_base();
        let decoder_context = CodecContext::from_parameters(stream.parameters())?;
        let mut decoder = decoder_context.decoder().video()?;

        let seek_target = seconds_to_seek_timestamp(seconds + start_offset);
        source.input_context.seek(seek_target, ..seek_target)?;

        let to_position = |frame: &VideoFrame| -> Option<(u64, f64)> {
            let pts = frame.timestamp().or(frame.pts())?;
            let timestamp = (pts_to_seconds(pts, time_base) - start_offset).max(0.0);
            Some((seconds_to_frame_number(timestamp, frames_per_second), timestamp))
        };

        let mut decoded_frame = VideoFrame::empty();

        for (stream, packet) in source.input_context.packets() {
            if stream.index() != stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                if let Some((frame_number, timestamp_sec)) = to_position(&decoded_frame)
                    && frame_number >= target_frame
                {
                    let image = convert_frame_to_image(&decoded_frame)?;
                    return Ok(Some(DecodedFrame {
                        frame_number,
                        timestamp_sec,
                        image,
                    }));
                }
            }
        }

        // Flush the decoder.
        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if let Some((frame_number, timestamp_sec)) = to_position(&decoded_frame)
                && frame_number >= target_frame
            {
                let image = convert_frame_to_image(&decoded_frame)?;
                return Ok(Some(DecodedFrame {
                    frame_number,
                    timestamp_sec,
                    image,
                }));
            }
        }

        Ok(None)
    }
}

/// Scale a decoded frame to RGB24 and wrap it as an [`image::DynamicImage`].
fn convert_frame_to_image(decoded_frame: &VideoFrame) -> Result<DynamicImage, MoviePrintError> {
    let (width, height) = (decoded_frame.width(), decoded_frame.height());
    let mut scaler = ScalingContext::get(
        decoded_frame.format(),
        width,
        height,
        Pixel::RGB24,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?;

    let mut rgb_frame = VideoFrame::empty();
    scaler.run(decoded_frame, &mut rgb_frame)?;

    let buffer = crate::conversion::frame_to_rgb_buffer(&rgb_frame, width, height);
    let rgb_image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        MoviePrintError::FfmpegError(
            "Failed to construct RGB image from decoded frame data".to_string(),
        )
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}

/// Decode the frame at `timestamp_sec` and write it to `output_path`.
///
/// Used for interactive re-sampling of a single thumbnail. The image format
/// follows the output extension.
///
/// # Errors
///
/// Returns [`MoviePrintError::InvalidTimestamp`] when `timestamp_sec` is
/// outside `0..=duration`, plus open, decode, and write errors.
///
/// # Example
///
/// ```no_run
/// use movieprint::extract_one;
///
/// let frame = extract_one("input.mp4", 12.5, "replacement.jpg")?;
/// println!("wrote frame {}", frame.frame_number);
/// # Ok::<(), movieprint::MoviePrintError>(())
/// ```
pub fn extract_one<P: AsRef<Path>, Q: AsRef<Path>>(
    video_path: P,
    timestamp_sec: f64,
    output_path: Q,
) -> Result<DecodedFrame, MoviePrintError> {
    let output_path = output_path.as_ref();
    let mut source = VideoSource::open(video_path)?;
    let frame = source.reader().frame_at_time(timestamp_sec)?;
    crate::finisher::save_frame_image(&frame.image, output_path)?;
    log::info!(
        "Extracted frame {} ({:.3}s) of {} to {}",
        frame.frame_number,
        frame.timestamp_sec,
        source.info.filename,
        output_path.display()
    );
    Ok(frame)
}
