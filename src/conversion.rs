//! Internal conversion helpers.
//!
//! Pixel-data copying and timestamp arithmetic shared by the decoder-based
//! extractors.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed RGB24 frame into a tightly-packed buffer.
///
/// Decoded frames often carry per-row padding (stride > width × 3). The
/// result can be handed straight to [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_bytes = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * (height as usize)].to_vec();
    }

    (0..height as usize)
        .flat_map(|row| &data[row * stride..row * stride + row_bytes])
        .copied()
        .collect()
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Map a position in seconds to the nearest absolute frame number.
///
/// Rounds rather than truncates so that `0.999999 × fps` lands on the frame
/// the container meant.
pub(crate) fn seconds_to_frame_number(seconds: f64, frames_per_second: f64) -> u64 {
    (seconds.max(0.0) * frames_per_second).round() as u64
}

/// Convert seconds to a container seek target in `AV_TIME_BASE` (µs).
///
/// `Input::seek` goes through `avformat_seek_file` with `stream_index = -1`,
/// which expects microseconds.
pub(crate) fn seconds_to_seek_timestamp(seconds: f64) -> i64 {
    (seconds.max(0.0) * 1_000_000.0) as i64
}

/// Round a timestamp to millisecond precision.
pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pts_rounds_to_nearest_frame() {
        let time_base = Rational::new(1, 1000);
        assert_eq!(seconds_to_frame_number(pts_to_seconds(999, time_base), 20.0), 20);
        assert_eq!(seconds_to_frame_number(pts_to_seconds(1000, time_base), 20.0), 20);
        assert_eq!(seconds_to_frame_number(-0.5, 20.0), 0);
    }

    #[test]
    fn seek_target_is_in_microseconds() {
        assert_eq!(seconds_to_seek_timestamp(2.0), 2_000_000);
        assert_eq!(seconds_to_seek_timestamp(-1.0), 0);
    }

    #[test]
    fn millisecond_rounding() {
        assert_eq!(round_millis(1.23456), 1.235);
        assert_eq!(round_millis(2.0), 2.0);
    }
}
