//! # movieprint
//!
//! Turn a video into a single contact-sheet image, a *movie print*.
//!
//! Frames are sampled at a fixed time or frame interval, or at detected shot
//! boundaries, then arranged into a grid or a shot-weighted timeline and
//! rendered with optional labels, rounded corners, and rotation. A JSON
//! sidecar records where every thumbnail landed so a viewer can map a click
//! back to its source frame.
//!
//! ## Quick Start
//!
//! ### One Print
//!
//! ```no_run
//! use movieprint::{ExtractionSpec, LayoutSpec, PrintSettings, process_video};
//!
//! let settings = PrintSettings::new(
//!     ExtractionSpec::interval_seconds(5.0).build()?,
//!     LayoutSpec::grid().with_columns(6).build()?,
//!     "prints/",
//! )?
//! .with_max_frames(36);
//!
//! let outcome = process_video("input.mp4".as_ref(), &settings, "input_movieprint.jpg")?;
//! println!("{}", outcome.print_path.display());
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```
//!
//! ### Shot Timeline
//!
//! ```no_run
//! use movieprint::{ExtractionSpec, LayoutSpec, PrintSettings, process_video};
//!
//! let settings = PrintSettings::new(
//!     ExtractionSpec::shots(12.0).build()?,
//!     LayoutSpec::timeline(1600, 120).build()?,
//!     "prints/",
//! )?;
//! process_video("input.mp4".as_ref(), &settings, "input_timeline.png")?;
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```
//!
//! ### Single Frame
//!
//! ```no_run
//! let frame = movieprint::extract_one("input.mp4", 42.5, "frame.png")?;
//! println!("frame {} at {:.3}s", frame.frame_number, frame.timestamp_sec);
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```
//!
//! ## Extraction
//!
//! Interval mode tries the `ffmpeg` executable on the GPU (when requested),
//! then on the CPU, then falls back to frame-accurate seeking through the
//! linked FFmpeg libraries. Shot mode runs FFmpeg's `scdet` filter and has
//! no fallback.
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `scene` | Shot-boundary detection via FFmpeg's `scdet` filter (default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed to build. Interval
//! extraction works best with the `ffmpeg` executable on the `PATH` (or
//! named by `MOVIEPRINT_FFMPEG`).

pub mod composition;
pub mod configuration;
mod conversion;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod finisher;
pub mod frame;
pub mod grid;
pub mod hardware;
pub mod label;
pub mod pipeline;
pub mod probe;
pub mod progress;
pub mod sampler;
pub mod scene;
pub mod sidecar;
pub mod timecode;
pub mod timeline;
pub mod transcoder;
pub mod video;

pub use composition::{
    ComposedPrint, CompositionOptions, RenderedPrint, Thumbnail, compose, compose_with_options,
    render,
};
pub use configuration::{
    Cadence, Color, DEFAULT_SHOT_THRESHOLD, ExtractionMode, ExtractionSpec, LabelContent,
    LabelPosition, LabelStyle, LayoutMode, LayoutSpec, OutputFormat, Rotation,
};
pub use conversion::round_millis;
pub use error::MoviePrintError;
pub use extract::{
    ExtractionContext, ExtractionStrategy, IntervalExtractor, SeekStrategy, TimeWindow, extract,
};
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use finisher::{EncodedPrint, encode, encode_with_limit, rotate, rotate_file_in_place};
pub use frame::{FrameRecord, LayoutItem, ShotSpan, locate};
pub use grid::{GridPlan, Placement, plan_grid};
pub use hardware::{HardwareAccelerationMode, HardwareDeviceType, available_hardware_devices};
pub use pipeline::{
    BatchReport, DEFAULT_OUTPUT_SUFFIX, DEFAULT_VIDEO_EXTENSIONS, PrintOutcome, PrintSettings,
    WorkDir, discover_videos, output_file_name, process_video, run_batch, unique_output_path,
};
pub use probe::{VideoInfo, VideoProbe, VideoSource};
pub use progress::{NoOpProgress, ProgressCallback, ProgressInfo};
pub use sampler::{Exclusions, Filtered, apply_exclusions, sample, sample_indices};
pub use scene::{ShotBoundaryExtractor, ShotCut};
pub use sidecar::{GenerationParameters, Sidecar, ThumbnailEntry};
pub use timecode::{format_timecode, format_timecode_short, parse_timecode};
pub use timeline::{TimelinePlan, WeightedSize, plan_timeline};
pub use transcoder::{FFMPEG_ENV, FfmpegTool, TranscoderStrategy};
pub use video::{DecodedFrame, SingleFrameReader, extract_one};
