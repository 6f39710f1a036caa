//! External transcoder strategy.
//!
//! Runs the `ffmpeg` executable with a `select` filter that keeps one frame
//! per cadence step inside the time window, and a `showinfo` filter whose
//! log lines report the presentation time of every kept frame. Frames are
//! written to a scratch directory first and renamed to their final
//! `frame_{seq}_absFN{n}` names only when the run succeeded, so a failed
//! attempt never leaves partial output behind.
//!
//! Timestamps are kept container-absolute with `-copyts`, and the stream
//! start time is subtracted inside the filter and from every reported
//! `pts_time`, so frame numbers agree with the seek strategy and the shot
//! detector on streams that do not start at zero.

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use crate::{
    configuration::{Cadence, OutputFormat},
    conversion::seconds_to_frame_number,
    error::MoviePrintError,
    extract::{ExtractionContext, ExtractionStrategy},
    frame::{FrameRecord, interval_frame_name},
};

/// Environment variable overriding the `ffmpeg` executable.
pub const FFMPEG_ENV: &str = "MOVIEPRINT_FFMPEG";

/// Handle to a usable `ffmpeg` executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegTool {
    program: PathBuf,
}

impl FfmpegTool {
    /// Locate `ffmpeg` (from `MOVIEPRINT_FFMPEG`, else the `PATH`) and check
    /// that it runs.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::ToolUnavailable`] when the executable is
    /// missing or `ffmpeg -version` fails.
    pub fn locate() -> Result<Self, MoviePrintError> {
        let program = std::env::var_os(FFMPEG_ENV)
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from("ffmpeg"), PathBuf::from);
        Self::with_program(program)
    }

    /// Use a specific executable after checking that it runs.
    ///
    /// # Errors
    ///
    /// Same as [`locate`](FfmpegTool::locate).
    pub fn with_program(program: impl Into<PathBuf>) -> Result<Self, MoviePrintError> {
        let program = program.into();
        let unavailable = |reason: String| MoviePrintError::ToolUnavailable {
            tool: program.display().to_string(),
            reason,
        };

        let output = Command::new(&program)
            .args(["-hide_banner", "-version"])
            .output()
            .map_err(|error| unavailable(error.to_string()))?;
        if !output.status.success() {
            return Err(unavailable(format!("`-version` exited with {}", output.status)));
        }

        Ok(Self { program })
    }

    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Interval extraction through the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct TranscoderStrategy {
    tool: FfmpegTool,
    hwaccel: Option<&'static str>,
}

impl TranscoderStrategy {
    /// Decode on the CPU.
    pub fn cpu(tool: FfmpegTool) -> Self {
        Self {
            tool,
            hwaccel: None,
        }
    }

    /// Decode with `-hwaccel <name>`.
    pub fn gpu(tool: FfmpegTool, hwaccel: &'static str) -> Self {
        Self {
            tool,
            hwaccel: Some(hwaccel),
        }
    }

    fn arguments(&self, context: &ExtractionContext<'_>, pattern: &Path) -> Vec<OsString> {
        let window = context.window;
        let mut arguments: Vec<OsString> =
            ["-hide_banner", "-nostdin", "-loglevel", "info"].map(OsString::from).into();

        if let Some(hwaccel) = self.hwaccel {
            arguments.extend(["-hwaccel", hwaccel].map(OsString::from));
        }
        // An input `-ss` is relative to the file start; ffmpeg adds the
        // container start time itself.
        if window.start > 0.0 {
            arguments.extend(["-ss".to_string(), format!("{:.6}", window.start)].map(OsString::from));
        }
        arguments.push("-copyts".into());

        arguments.push("-i".into());
        arguments.push(context.video_path.as_os_str().to_os_string());

        let cadence = context.spec.cadence().unwrap_or(Cadence::Frames(1));
        let filter = select_filter(
            cadence,
            window.start,
            window.end,
            context.info.frames_per_second,
            context.info.start_offset_sec,
        );
        arguments.extend(["-vf".to_string(), filter].map(OsString::from));
        arguments.extend(["-fps_mode", "vfr"].map(OsString::from));
        if context.spec.output_format == OutputFormat::Jpg {
            arguments.extend(["-q:v", "2"].map(OsString::from));
        }
        arguments.push("-y".into());
        arguments.push(pattern.as_os_str().to_os_string());
        arguments
    }
}

impl ExtractionStrategy for TranscoderStrategy {
    fn name(&self) -> String {
        match self.hwaccel {
            Some(hwaccel) => format!("ffmpeg ({hwaccel})"),
            None => "ffmpeg (cpu)".to_string(),
        }
    }

    fn extract(&self, context: &ExtractionContext<'_>) -> Result<Vec<FrameRecord>, MoviePrintError> {
        let extension = context.spec.output_format.extension();
        let scratch = tempfile::Builder::new()
            .prefix(".movieprint_ffmpeg_")
            .tempdir_in(context.output_dir)?;
        let pattern = scratch.path().join(format!("%06d.{extension}"));

        let arguments = self.arguments(context, &pattern);
        log::debug!(
            "Running {} {}",
            self.tool.program().display(),
            arguments
                .iter()
                .map(|argument| argument.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let output = Command::new(self.tool.program())
            .args(&arguments)
            .output()
            .map_err(|error| MoviePrintError::ToolUnavailable {
                tool: self.tool.program().display().to_string(),
                reason: error.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
            return Err(MoviePrintError::ExtractionFailed {
                video: context.video_path.to_path_buf(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.name(),
                    output.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            });
        }

        let start_offset = context.info.start_offset_sec;
        let times: Vec<f64> = parse_showinfo_times(&stderr)
            .into_iter()
            .map(|time| (time - start_offset).max(0.0))
            .collect();
        let mut written: Vec<PathBuf> = fs::read_dir(scratch.path())?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == extension))
            .collect();
        written.sort();

        if written.len() != times.len() {
            return Err(MoviePrintError::ExtractionFailed {
                video: context.video_path.to_path_buf(),
                reason: format!(
                    "{} wrote {} frames but reported {}",
                    self.name(),
                    written.len(),
                    times.len()
                ),
            });
        }

        let frames_per_second = context.info.frames_per_second;
        let mut records = Vec::with_capacity(written.len());
        for (sequence, (path, timestamp)) in written.iter().zip(times).enumerate() {
            let frame_number = seconds_to_frame_number(timestamp, frames_per_second);
            let destination = context
                .output_dir
                .join(interval_frame_name(sequence, frame_number, extension));
            fs::rename(path, &destination)?;
            records.push(FrameRecord::new(
                context.info.filename.clone(),
                frame_number,
                timestamp,
                destination,
            ));
        }

        Ok(records)
    }
}

/// Build the `select` + `showinfo` filter for a cadence over `[start, end)`.
///
/// `start` and `end` are relative to the stream start; `start_offset` is the
/// stream start time the filter's container-absolute `t` is shifted by.
/// A frame is kept when it falls into a new cadence bucket. Frames within
/// half a frame of a bucket boundary count as inside it, matching the
/// nearest-frame rounding used for absolute frame numbers.
fn select_filter(
    cadence: Cadence,
    start: f64,
    end: f64,
    frames_per_second: f64,
    start_offset: f64,
) -> String {
    let half_frame = 0.5 / frames_per_second;
    let low = start + start_offset - half_frame;
    let high = end + start_offset - half_frame;
    let window = format!("gte(t\\,{low:.6})*lt(t\\,{high:.6})");
    let step = match cadence {
        Cadence::Seconds(seconds) => format!(
            "gt(floor((t-({low:.6}))/{seconds:.6})\\,\
             floor((prev_selected_t-({low:.6}))/{seconds:.6}))"
        ),
        Cadence::Frames(frames) => {
            let start_frame = seconds_to_frame_number(start, frames_per_second);
            format!(
                "not(mod(round((t-{start_offset:.6})*{frames_per_second:.6})-{start_frame}\\,{frames}))"
            )
        }
    };
    format!("select='{window}*(isnan(prev_selected_t)+{step})',showinfo")
}

/// Collect `pts_time:` values from `showinfo` log lines, in output order.
fn parse_showinfo_times(stderr: &str) -> Vec<f64> {
    stderr
        .lines()
        .filter(|line| line.contains("Parsed_showinfo"))
        .filter_map(|line| {
            let rest = &line[line.find("pts_time:")? + "pts_time:".len()..];
            rest.split_whitespace().next()?.parse::<f64>().ok()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_filter_selects_new_buckets() {
        let filter = select_filter(Cadence::Seconds(1.0), 0.0, 3.0, 20.0, 0.0);
        assert!(filter.starts_with("select='gte(t\\,-0.025000)*lt(t\\,2.975000)"));
        assert!(filter.contains("isnan(prev_selected_t)"));
        assert!(filter.contains("floor((t-(-0.025000))/1.000000)"));
        assert!(filter.ends_with("',showinfo"));
    }

    #[test]
    fn frames_filter_uses_frame_modulo() {
        let filter = select_filter(Cadence::Frames(30), 2.0, 10.0, 25.0, 0.0);
        assert!(filter.contains("not(mod(round((t-0.000000)*25.000000)-50\\,30))"));
    }

    #[test]
    fn filter_bounds_follow_the_stream_start() {
        let filter = select_filter(Cadence::Seconds(1.0), 0.0, 3.0, 20.0, 1.4);
        assert!(filter.starts_with("select='gte(t\\,1.375000)*lt(t\\,4.375000)"), "{filter}");
        assert!(filter.contains("floor((t-(1.375000))/1.000000)"));

        let filter = select_filter(Cadence::Frames(10), 0.0, 3.0, 20.0, 1.4);
        assert!(filter.contains("round((t-1.400000)*20.000000)-0\\,10"), "{filter}");
    }

    #[test]
    fn parses_showinfo_lines() {
        let stderr = "\
[Parsed_showinfo_1 @ 0x5581] config in time_base: 1/20, frame_rate: 20/1
[Parsed_showinfo_1 @ 0x5581] n:   0 pts:      0 pts_time:0       duration:1 fmt:yuv420p
[Parsed_showinfo_1 @ 0x5581] n:   1 pts:     20 pts_time:1       duration:1 fmt:yuv420p
frame=    2 fps=0.0 q=2.0 size=N/A
[Parsed_showinfo_1 @ 0x5581] n:   2 pts:     40 pts_time:2.05    duration:1 fmt:yuv420p
";
        assert_eq!(parse_showinfo_times(stderr), vec![0.0, 1.0, 2.05]);
    }

    #[test]
    fn missing_program_is_unavailable() {
        let error = FfmpegTool::with_program("/nonexistent/ffmpeg-binary").unwrap_err();
        assert!(matches!(error, MoviePrintError::ToolUnavailable { .. }));
    }
}
