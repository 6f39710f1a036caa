use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use movieprint::{
    Color, DEFAULT_OUTPUT_SUFFIX, DEFAULT_SHOT_THRESHOLD, Exclusions, ExtractionSpec,
    FfmpegLogLevel, HardwareAccelerationMode, LabelContent, LabelPosition, LabelStyle, LayoutSpec,
    NoOpProgress, OutputFormat, PrintSettings, ProgressCallback, ProgressInfo, Rotation,
    VideoProbe, format_timecode, parse_timecode,
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  movieprint make movie.mp4 --out prints --interval 10 --columns 6\n  movieprint make movie.mp4 --out prints --shots --layout timeline --row-height 90\n  movieprint make movies/ --out prints --recursive --max-frames 60 --progress\n  movieprint frame movie.mp4 --time 00:12:30.5 --out frame.jpg\n  movieprint completions zsh > _movieprint";

#[derive(Debug, Parser)]
#[command(
    name = "movieprint",
    version,
    about = "Turn videos into contact-sheet images",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar for batches.
    #[arg(long)]
    progress: bool,

    /// Allow overwriting existing output files.
    #[arg(long)]
    overwrite: bool,

    /// FFmpeg library log level (quiet, error, warning, info, verbose, debug).
    #[arg(long)]
    ffmpeg_log_level: Option<String>,

    /// Hardware decode mode for interval extraction (auto, software, cuda, vaapi, dxva2, d3d11va, videotoolbox, qsv).
    #[arg(long)]
    hardware: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Make one print per input video.
    #[command(
        about = "Make movie prints",
        after_help = "Examples:\n  movieprint make movie.mp4 --out prints --interval 5 --columns 5 --label timecode\n  movieprint make movie.mp4 --out prints --interval-frames 250 --start 00:01:00 --end 00:05:00\n  movieprint make movie.mp4 --out prints --shots --threshold 12 --layout timeline\n  movieprint make movie.mp4 --out prints --fit 1920x1080 --rotate 90 --max-kib 800"
    )]
    Make {
        /// Video files or directories.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory receiving prints and sidecars.
        #[arg(long)]
        out: PathBuf,

        /// Take a frame every N seconds.
        #[arg(long, conflicts_with = "shots")]
        interval: Option<f64>,
        /// Take a frame every N frames.
        #[arg(long, conflicts_with = "shots")]
        interval_frames: Option<u64>,
        /// Take the first frame of every detected shot.
        #[arg(long)]
        shots: bool,
        /// Shot-detector threshold (0-100).
        #[arg(long, requires = "shots")]
        threshold: Option<f64>,
        /// Window start (seconds or HH:MM:SS[.mmm]).
        #[arg(long)]
        start: Option<String>,
        /// Window end, exclusive (seconds or HH:MM:SS[.mmm]).
        #[arg(long)]
        end: Option<String>,
        /// Frame image format (jpg, png).
        #[arg(long, default_value = "jpg")]
        format: String,

        /// Layout discipline (grid, timeline).
        #[arg(long, default_value = "grid")]
        layout: String,
        /// Grid columns.
        #[arg(long)]
        columns: Option<u32>,
        /// Grid rows.
        #[arg(long)]
        rows: Option<u32>,
        /// Grid cell width in pixels.
        #[arg(long)]
        thumb_width: Option<u32>,
        /// Timeline row height in pixels.
        #[arg(long, default_value_t = 100)]
        row_height: u32,
        /// Timeline canvas width in pixels.
        #[arg(long, default_value_t = 1200)]
        canvas_width: u32,
        /// Gap between thumbnails.
        #[arg(long)]
        padding: Option<u32>,
        /// Outer border.
        #[arg(long)]
        margin: Option<u32>,
        /// Canvas colour as #RRGGBB or #RRGGBBAA.
        #[arg(long)]
        background: Option<String>,
        /// Corner radius at a 480px-wide thumbnail.
        #[arg(long)]
        corner_radius: Option<u32>,
        /// Clockwise thumbnail rotation (0, 90, 180, 270).
        #[arg(long, default_value_t = 0)]
        rotate: u32,
        /// JPEG quality (1-100).
        #[arg(long)]
        quality: Option<u8>,
        /// Force a grid canvas of exactly WIDTHxHEIGHT.
        #[arg(long)]
        fit: Option<String>,
        /// Label every thumbnail (timecode, frame).
        #[arg(long)]
        label: Option<String>,
        /// Label corner (top-left, top-right, bottom-left, bottom-right).
        #[arg(long, requires = "label")]
        label_position: Option<String>,
        /// Height of a header band showing the file name and window.
        #[arg(long)]
        header_height: Option<u32>,

        /// Grid only: down-sample to at most N frames.
        #[arg(long)]
        max_frames: Option<usize>,
        /// Comma-separated absolute frame numbers to leave out (interval mode).
        #[arg(long, conflicts_with = "exclude_shots")]
        exclude_frames: Option<String>,
        /// Comma-separated 1-based shot numbers to leave out (shot mode).
        #[arg(long)]
        exclude_shots: Option<String>,
        /// Print file name; only used for a single video file input.
        #[arg(long)]
        name: Option<String>,
        /// Suffix for generated print names.
        #[arg(long, default_value = DEFAULT_OUTPUT_SUFFIX)]
        suffix: String,
        /// Keep extracted frames under this directory.
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        /// Do not write JSON sidecars.
        #[arg(long)]
        no_sidecar: bool,
        /// Shrink prints larger than this many KiB.
        #[arg(long)]
        max_kib: Option<u64>,
        /// Comma-separated video extensions to scan for.
        #[arg(long)]
        extensions: Option<String>,
        /// Scan directories recursively.
        #[arg(long)]
        recursive: bool,
    },

    /// Extract one frame at a timestamp.
    #[command(
        about = "Extract a single frame",
        after_help = "Examples:\n  movieprint frame movie.mp4 --time 95.25 --out frame.png\n  movieprint frame movie.mp4 --time 00:01:35.250 --out frame.jpg --overwrite"
    )]
    Frame {
        /// Input video path.
        input: PathBuf,
        /// Timestamp (seconds or HH:MM:SS[.mmm]).
        #[arg(long)]
        time: String,
        /// Output image path (.jpg or .png).
        #[arg(long)]
        out: PathBuf,
    },

    /// Print video properties.
    #[command(
        about = "Print video properties",
        visible_alias = "info",
        after_help = "Examples:\n  movieprint probe movie.mp4\n  movieprint probe movie.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,
        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_label_content(value: &str) -> Option<LabelContent> {
    match value.to_ascii_lowercase().as_str() {
        "timecode" | "time" | "tc" => Some(LabelContent::Timecode),
        "frame" | "frames" | "frame-number" | "frame_number" => Some(LabelContent::FrameNumber),
        _ => None,
    }
}

fn parse_dimensions(value: &str) -> Option<(u32, u32)> {
    let lowered = value.to_ascii_lowercase();
    let (width, height) = lowered.split_once(['x', '*'])?;
    let width = width.trim().parse().ok()?;
    let height = height.trim().parse().ok()?;
    (width > 0 && height > 0).then_some((width, height))
}

fn parse_list<T: std::str::FromStr>(value: &str) -> Result<Vec<T>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| item.parse().map_err(|_| format!("invalid list entry: {item}")))
        .collect()
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .try_init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    if let Some(level) = &global.ffmpeg_log_level {
        let parsed = FfmpegLogLevel::parse(level)
            .ok_or(format!("unsupported --ffmpeg-log-level: {level}"))?;
        movieprint::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_length(info.total as u64);
        match &info.video {
            Some(video) => {
                self.bar.set_position(info.current.saturating_sub(1) as u64);
                let name = video
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                self.bar.set_message(name);
            }
            None => {
                self.bar.set_position(info.total as u64);
                self.bar
                    .finish_with_message(format!("done in {:.1}s", info.elapsed.as_secs_f64()));
            }
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match cli.command {
        Commands::Make {
            inputs,
            out,
            interval,
            interval_frames,
            shots,
            threshold,
            start,
            end,
            format,
            layout,
            columns,
            rows,
            thumb_width,
            row_height,
            canvas_width,
            padding,
            margin,
            background,
            corner_radius,
            rotate,
            quality,
            fit,
            label,
            label_position,
            header_height,
            max_frames,
            exclude_frames,
            exclude_shots,
            name,
            suffix,
            frames_dir,
            no_sidecar,
            max_kib,
            extensions,
            recursive,
        } => {
            let format = OutputFormat::parse(&format).ok_or(format!("unsupported --format: {format}"))?;
            let hardware = match &cli.global.hardware {
                Some(value) => HardwareAccelerationMode::parse(value)
                    .ok_or(format!("unsupported --hardware mode: {value}"))?,
                None => HardwareAccelerationMode::Software,
            };

            let extraction = if shots {
                ExtractionSpec::shots(threshold.unwrap_or(DEFAULT_SHOT_THRESHOLD))
            } else {
                match (interval, interval_frames) {
                    (None, Some(frames)) => ExtractionSpec::interval_frames(frames),
                    (Some(seconds), frames) => {
                        let spec = ExtractionSpec::interval_seconds(seconds);
                        match frames {
                            Some(frames) => spec.with_interval_frames(frames),
                            None => spec,
                        }
                    }
                    (None, None) => ExtractionSpec::interval_seconds(1.0),
                }
            };
            let start = start.as_deref().map(parse_timecode).transpose()?;
            let end = end.as_deref().map(parse_timecode).transpose()?;
            let extraction = extraction
                .with_window(start, end)
                .with_output_format(format)
                .with_hardware(hardware)
                .build()?;

            let mut layout_spec = match layout.to_ascii_lowercase().as_str() {
                "grid" if columns.is_some() || rows.is_some() => LayoutSpec::grid().with_grid(columns, rows),
                "grid" => LayoutSpec::grid(),
                "timeline" => LayoutSpec::timeline(canvas_width, row_height),
                other => return Err(format!("unsupported --layout: {other}").into()),
            };
            if let Some(width) = thumb_width {
                layout_spec = layout_spec.with_thumbnail_width(width);
            }
            if let Some(padding) = padding {
                layout_spec = layout_spec.with_padding(padding);
            }
            if let Some(margin) = margin {
                layout_spec = layout_spec.with_margin(margin);
            }
            if let Some(value) = &background {
                let color = Color::parse_hex(value).ok_or(format!("invalid --background colour: {value}"))?;
                layout_spec = layout_spec.with_background(color);
            }
            if let Some(radius) = corner_radius {
                layout_spec = layout_spec.with_corner_radius(radius);
            }
            let rotation = Rotation::from_degrees(rotate)
                .ok_or(format!("--rotate must be 0, 90, 180, or 270 (got {rotate})"))?;
            layout_spec = layout_spec.with_rotation(rotation);
            if let Some(quality) = quality {
                layout_spec = layout_spec.with_quality(quality);
            }
            if let Some(value) = &fit {
                let (width, height) =
                    parse_dimensions(value).ok_or(format!("--fit expects WIDTHxHEIGHT (got {value})"))?;
                layout_spec = layout_spec.with_fixed_canvas(width, height);
            }
            if let Some(value) = &label {
                let content = parse_label_content(value).ok_or(format!("unsupported --label: {value}"))?;
                let mut style = LabelStyle::default().with_content(content);
                if let Some(position) = &label_position {
                    let position = LabelPosition::parse(position)
                        .ok_or(format!("unsupported --label-position: {position}"))?;
                    style = style.with_position(position);
                }
                layout_spec = layout_spec.with_label(style);
            }
            if let Some(height) = header_height {
                layout_spec.header_height = height;
            }
            let layout_spec = layout_spec.build()?;

            let exclusions = match (exclude_frames, exclude_shots) {
                (Some(frames), _) => Exclusions::Frames(parse_list(&frames)?),
                (None, Some(shots)) => Exclusions::Shots(parse_list(&shots)?),
                (None, None) => Exclusions::None,
            };

            let mut settings = PrintSettings::new(extraction, layout_spec, &out)?
                .with_exclusions(exclusions)
                .with_output_suffix(suffix)
                .with_sidecar(!no_sidecar)
                .with_overwrite(cli.global.overwrite)
                .with_recursive(recursive);
            if let Some(max_frames) = max_frames {
                settings = settings.with_max_frames(max_frames);
            }
            if let Some(name) = name {
                settings = settings.with_output_filename(name);
            }
            if let Some(root) = frames_dir {
                settings = settings.with_frame_root(root);
            }
            if let Some(kib) = max_kib {
                settings = settings.with_max_output_kib(kib);
            }
            if let Some(list) = &extensions {
                settings = settings.with_video_extensions(parse_list::<String>(list)?);
            }
            settings.validate()?;

            let progress: Arc<dyn ProgressCallback> = if cli.global.progress {
                Arc::new(TerminalProgress::new()?)
            } else {
                Arc::new(NoOpProgress)
            };
            let report = movieprint::run_batch(&inputs, &settings, progress)?;

            for (video, print) in &report.succeeded {
                println!("{} {} -> {}", "saved".green().bold(), video.display(), print.display());
            }
            for (video, reason) in &report.failed {
                eprintln!("{} {}: {reason}", "failed:".red().bold(), video.display());
            }
            if !report.is_success() {
                return Err(format!(
                    "{} of {} videos failed",
                    report.failed.len(),
                    report.failed.len() + report.succeeded.len()
                )
                .into());
            }
        }
        Commands::Frame { input, time, out } => {
            if out.exists() {
                if cli.global.overwrite {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("overwriting {}", out.display()).yellow()
                    );
                } else {
                    return Err(format!(
                        "output already exists: {} (use --overwrite to replace)",
                        out.display()
                    )
                    .into());
                }
            }
            let seconds = parse_timecode(&time)?;
            let frame = movieprint::extract_one(&input, seconds, &out)?;
            println!(
                "{} frame {} ({}) to {}",
                "saved".green().bold(),
                frame.frame_number,
                format_timecode(frame.timestamp_sec),
                out.display()
            );
        }
        Commands::Probe { input, json } => {
            let info = VideoProbe::probe(&input)?;
            if json {
                let payload = json!({
                    "filename": info.filename,
                    "width": info.width,
                    "height": info.height,
                    "fps": info.frames_per_second,
                    "duration_seconds": info.duration_sec,
                    "frame_count": info.frame_count,
                    "codec": info.codec,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("File: {}", info.filename);
                println!(
                    "Video: {}x{} @ {:.3} fps [{}]",
                    info.width, info.height, info.frames_per_second, info.codec
                );
                println!(
                    "Duration: {} ({} frames)",
                    format_timecode(info.duration_sec),
                    info.frame_count
                );
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "movieprint", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_dimensions, parse_label_content, parse_list};
    use movieprint::LabelContent;

    #[test]
    fn parse_label_content_aliases() {
        assert_eq!(parse_label_content("timecode"), Some(LabelContent::Timecode));
        assert_eq!(parse_label_content("TC"), Some(LabelContent::Timecode));
        assert_eq!(parse_label_content("frame"), Some(LabelContent::FrameNumber));
        assert_eq!(parse_label_content("title"), None);
    }

    #[test]
    fn parse_dimensions_formats() {
        assert_eq!(parse_dimensions("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_dimensions("800X600"), Some((800, 600)));
        assert_eq!(parse_dimensions("0x600"), None);
        assert_eq!(parse_dimensions("1920"), None);
    }

    #[test]
    fn parse_list_entries() {
        assert_eq!(parse_list::<u64>("3, 10,,42").unwrap(), vec![3, 10, 42]);
        assert!(parse_list::<u64>("3,x").is_err());
        assert_eq!(
            parse_list::<String>("mp4,.mkv").unwrap(),
            vec!["mp4".to_string(), ".mkv".to_string()]
        );
    }
}
