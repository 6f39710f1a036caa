//! Console verbosity of the linked FFmpeg libraries.
//!
//! Decoding and shot detection run inside the linked libraries, which write
//! their own diagnostics to stderr independently of the `log` facade. The
//! CLI exposes this as `--ffmpeg-log-level`.

use ffmpeg_next::util::log::Level;

/// How much the FFmpeg libraries print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FfmpegLogLevel {
    /// Nothing.
    Quiet,
    /// Errors only.
    #[default]
    Error,
    /// Errors and warnings.
    Warning,
    /// Informational messages.
    Info,
    /// Verbose messages.
    Verbose,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    /// Parse a level name (`quiet`, `error`, `warning`/`warn`, `info`,
    /// `verbose`, `debug`).
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Some(FfmpegLogLevel::Quiet),
            "error" => Some(FfmpegLogLevel::Error),
            "warning" | "warn" => Some(FfmpegLogLevel::Warning),
            "info" => Some(FfmpegLogLevel::Info),
            "verbose" => Some(FfmpegLogLevel::Verbose),
            "debug" => Some(FfmpegLogLevel::Debug),
            _ => None,
        }
    }

    fn level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

/// Set the verbosity of the linked FFmpeg libraries.
///
/// Does not affect the `ffmpeg` executable used for interval extraction,
/// whose output is captured and parsed.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.level());
}
