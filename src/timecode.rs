//! Timecode parsing and formatting.
//!
//! Accepts plain seconds (`"75"`, `"12.5"`), `MM:SS`, and `HH:MM:SS[.fff]`.

use crate::error::MoviePrintError;

/// Parse a user-supplied time value into seconds.
///
/// # Errors
///
/// Returns [`MoviePrintError::InvalidParameters`] for empty, negative, or
/// malformed values, and for minute/second fields of 60 or more.
///
/// # Example
///
/// ```
/// use movieprint::parse_timecode;
///
/// assert_eq!(parse_timecode("01:15").unwrap(), 75.0);
/// assert_eq!(parse_timecode("00:01:15.5").unwrap(), 75.5);
/// ```
pub fn parse_timecode(value: &str) -> Result<f64, MoviePrintError> {
    let trimmed = value.trim();
    let invalid = |detail: &str| {
        MoviePrintError::InvalidParameters(format!("invalid time value '{trimmed}': {detail}"))
    };

    if trimmed.is_empty() {
        return Err(invalid("time value cannot be empty"));
    }

    if !trimmed.contains(':') {
        let seconds = trimmed
            .parse::<f64>()
            .map_err(|_| invalid("expected seconds, MM:SS or HH:MM:SS"))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(invalid("must be a non-negative number"));
        }
        return Ok(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => ("0", *minutes, *seconds),
        [hours, minutes, seconds] => (*hours, *minutes, *seconds),
        _ => return Err(invalid("expected seconds, MM:SS or HH:MM:SS")),
    };

    let hours = hours.parse::<u64>().map_err(|_| invalid("bad hours field"))?;
    let minutes = minutes
        .parse::<u64>()
        .map_err(|_| invalid("bad minutes field"))?;
    let seconds = seconds
        .parse::<f64>()
        .map_err(|_| invalid("bad seconds field"))?;

    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return Err(invalid("minutes and seconds must be below 60"));
    }

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds)
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_timecode(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60,
        millis
    )
}

/// Format seconds as `HH:MM:SS`, dropping the fractional part.
pub fn format_timecode_short(seconds: f64) -> String {
    let total_seconds = seconds.max(0.0) as u64;
    format!(
        "{:02}:{:02}:{:02}",
        total_seconds / 3600,
        (total_seconds / 60) % 60,
        total_seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timecode_formats() {
        assert_eq!(parse_timecode("75").unwrap(), 75.0);
        assert_eq!(parse_timecode("01:15").unwrap(), 75.0);
        assert_eq!(parse_timecode("00:01:15.5").unwrap(), 75.5);
        assert_eq!(parse_timecode(" 2:00:00 ").unwrap(), 7200.0);
    }

    #[test]
    fn parse_timecode_rejects_garbage() {
        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("-3").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
        assert!(parse_timecode("00:75").is_err());
        assert!(parse_timecode("ab:cd").is_err());
    }

    #[test]
    fn format_round_trips_common_values() {
        assert_eq!(format_timecode(0.0), "00:00:00.000");
        assert_eq!(format_timecode(3725.25), "01:02:05.250");
        assert_eq!(format_timecode_short(3725.9), "01:02:05");
    }
}
