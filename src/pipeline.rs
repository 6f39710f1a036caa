//! End-to-end print generation.
//!
//! [`process_video`] runs one video through extraction, exclusion filtering,
//! down-sampling, rotation, composition, and the sidecar. [`run_batch`]
//! discovers videos from files and directories and processes each one,
//! collecting failures instead of stopping at the first.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::{
    composition::{CompositionOptions, Thumbnail, compose_with_options},
    configuration::{ExtractionMode, ExtractionSpec, LayoutMode, LayoutSpec, OutputFormat, Rotation},
    error::MoviePrintError,
    extract::{TimeWindow, extract},
    finisher::rotate_file_in_place,
    frame::FrameRecord,
    probe::VideoProbe,
    progress::{BatchTracker, ProgressCallback},
    sampler::{Exclusions, apply_exclusions, sample},
    sidecar::{GenerationParameters, Sidecar},
    timecode::format_timecode_short,
};

/// Video extensions recognised by default.
pub const DEFAULT_VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "flv", "wmv"];

/// Suffix appended to the video stem for generated print names.
pub const DEFAULT_OUTPUT_SUFFIX: &str = "_movieprint";

/// Everything one pipeline invocation needs.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct PrintSettings {
    /// Extraction parameters.
    pub extraction: ExtractionSpec,
    /// Layout parameters.
    pub layout: LayoutSpec,
    /// Frames or shots to leave out.
    pub exclusions: Exclusions,
    /// Grid only: down-sample to at most this many frames.
    pub max_frames_for_print: Option<usize>,
    /// Directory receiving prints and sidecars.
    pub output_dir: PathBuf,
    /// Explicit print file name; only used for a single video file input.
    pub output_filename: Option<String>,
    /// Suffix for generated print names.
    pub output_suffix: String,
    /// Keep frames under `<frame_root>/movieprint_temp_<stem>` instead of a
    /// temporary directory.
    pub frame_root: Option<PathBuf>,
    /// Write a JSON sidecar next to each print.
    pub save_sidecar: bool,
    /// Shrink prints larger than this many KiB.
    pub max_output_kib: Option<u64>,
    /// Replace existing prints instead of picking a free name.
    pub overwrite: bool,
    /// Extensions treated as videos when scanning directories.
    pub video_extensions: Vec<String>,
    /// Scan directories recursively.
    pub recursive: bool,
}

impl PrintSettings {
    /// Settings with defaults for everything but the specs and output
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::InvalidParameters`] when the combination
    /// is invalid; see [`validate`](PrintSettings::validate).
    pub fn new(
        extraction: ExtractionSpec,
        layout: LayoutSpec,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, MoviePrintError> {
        let settings = Self {
            extraction,
            layout,
            exclusions: Exclusions::None,
            max_frames_for_print: None,
            output_dir: output_dir.into(),
            output_filename: None,
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
            frame_root: None,
            save_sidecar: true,
            max_output_kib: None,
            overwrite: false,
            video_extensions: DEFAULT_VIDEO_EXTENSIONS.map(String::from).to_vec(),
            recursive: false,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Set the exclusions.
    pub fn with_exclusions(mut self, exclusions: Exclusions) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Set the grid down-sampling target.
    pub fn with_max_frames(mut self, max_frames: usize) -> Self {
        self.max_frames_for_print = Some(max_frames);
        self
    }

    /// Use an explicit print file name.
    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }

    /// Set the suffix for generated names.
    pub fn with_output_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.output_suffix = suffix.into();
        self
    }

    /// Keep extracted frames under `root` instead of a temporary directory.
    pub fn with_frame_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.frame_root = Some(root.into());
        self
    }

    /// Enable or disable the JSON sidecar.
    pub fn with_sidecar(mut self, enabled: bool) -> Self {
        self.save_sidecar = enabled;
        self
    }

    /// Cap the encoded print size.
    pub fn with_max_output_kib(mut self, kib: u64) -> Self {
        self.max_output_kib = Some(kib);
        self
    }

    /// Replace existing prints.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the recognised video extensions.
    pub fn with_video_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.video_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Scan directories recursively.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Check both specs and the rules that tie them together.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::InvalidParameters`] when a spec is
    /// invalid, a timeline layout is paired with interval extraction,
    /// exclusions do not match the extraction mode, or a size limit is 0.
    pub fn validate(&self) -> Result<(), MoviePrintError> {
        let invalid = |message: &str| Err(MoviePrintError::InvalidParameters(message.into()));

        self.extraction.validate()?;
        self.layout.validate()?;

        if self.layout.mode == LayoutMode::Timeline && self.extraction.mode != ExtractionMode::Shot {
            return invalid("timeline layout requires shot extraction");
        }
        match (&self.exclusions, self.extraction.mode) {
            (Exclusions::Frames(frames), ExtractionMode::Shot) if !frames.is_empty() => {
                return invalid("frame exclusions only apply to interval extraction");
            }
            (Exclusions::Shots(shots), ExtractionMode::Interval) if !shots.is_empty() => {
                return invalid("shot exclusions only apply to shot extraction");
            }
            _ => {}
        }
        if self.max_frames_for_print == Some(0) {
            return invalid("max frames for print must be at least 1");
        }
        if self.max_output_kib == Some(0) {
            return invalid("max output size must be at least 1 KiB");
        }
        if let Some(name) = &self.output_filename
            && (name.is_empty() || name.contains(['/', '\\']))
        {
            return invalid("output file name must be a plain file name");
        }
        if self.video_extensions.is_empty() {
            return invalid("at least one video extension is required");
        }

        Ok(())
    }
}

/// Outcome of one successfully processed video.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintOutcome {
    /// Source video.
    pub video: PathBuf,
    /// Written print.
    pub print_path: PathBuf,
    /// Written sidecar, if enabled.
    pub sidecar_path: Option<PathBuf>,
    /// Frames produced by extraction.
    pub frames_extracted: usize,
    /// Thumbnails on the print.
    pub frames_in_print: usize,
    /// Non-fatal problems (unmatched exclusions, rotation failures, ...).
    pub warnings: Vec<String>,
}

/// Result of [`run_batch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// `(video, print)` for every video that produced a print.
    pub succeeded: Vec<(PathBuf, PathBuf)>,
    /// `(video, reason)` for every video that failed.
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    /// Whether every video produced a print.
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Where extracted frames live while a print is made.
#[derive(Debug)]
pub enum WorkDir {
    /// Removed when dropped.
    Temporary(TempDir),
    /// Caller-owned; never removed.
    Persistent(PathBuf),
}

impl WorkDir {
    /// A fresh temporary directory, or `<root>/movieprint_temp_<stem>` when
    /// a root is given.
    ///
    /// # Errors
    ///
    /// Returns [`MoviePrintError::IoError`] when the directory cannot be
    /// created.
    pub fn for_video(video: &Path, root: Option<&Path>) -> Result<Self, MoviePrintError> {
        let stem = file_stem(video);
        match root {
            Some(root) => {
                let path = root.join(format!("movieprint_temp_{stem}"));
                fs::create_dir_all(&path)?;
                log::info!("Using frame directory {}", path.display());
                Ok(WorkDir::Persistent(path))
            }
            None => {
                let dir = tempfile::Builder::new()
                    .prefix(&format!("movieprint_{stem}_"))
                    .tempdir()?;
                log::info!("Using temporary directory {}", dir.path().display());
                Ok(WorkDir::Temporary(dir))
            }
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Temporary(dir) => dir.path(),
            WorkDir::Persistent(path) => path,
        }
    }

    /// Whether the directory is removed on drop.
    pub fn is_temporary(&self) -> bool {
        matches!(self, WorkDir::Temporary(_))
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

fn has_extension(path: &Path, extensions: &BTreeSet<String>) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extensions.contains(&extension.to_ascii_lowercase()))
}

/// Collect video files from files and directories.
///
/// Directories are scanned one level deep, or fully when `recursive`.
/// Extensions compare case-insensitively, with or without a leading dot.
/// Missing paths and unrecognised files are logged and skipped. The result
/// is sorted and free of duplicates.
///
/// # Errors
///
/// Returns [`MoviePrintError::NoVideoFound`] when nothing matched.
pub fn discover_videos<P: AsRef<Path>>(
    inputs: &[P],
    extensions: &[String],
    recursive: bool,
) -> Result<Vec<PathBuf>, MoviePrintError> {
    let extensions: BTreeSet<String> = extensions
        .iter()
        .map(|extension| extension.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|extension| !extension.is_empty())
        .collect();
    let mut videos = BTreeSet::new();

    for input in inputs {
        let input = input.as_ref();
        if input.is_file() {
            if has_extension(input, &extensions) {
                videos.insert(input.to_path_buf());
            } else {
                log::warn!("Skipping {}: not a recognised video extension", input.display());
            }
        } else if input.is_dir() {
            let walker = WalkDir::new(input)
                .min_depth(1)
                .max_depth(if recursive { usize::MAX } else { 1 });
            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && has_extension(entry.path(), &extensions) => {
                        videos.insert(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(error) => log::warn!("Skipping unreadable entry under {}: {error}", input.display()),
                }
            }
        } else {
            log::warn!("Skipping {}: no such file or directory", input.display());
        }
    }

    if videos.is_empty() {
        return Err(MoviePrintError::NoVideoFound);
    }
    log::info!("Found {} video file(s)", videos.len());
    Ok(videos.into_iter().collect())
}

/// `path` itself if free, else the first free `<stem>_1.<ext>`,
/// `<stem>_2.<ext>`, ...
pub fn unique_output_path(path: &Path) -> PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }
    let stem = file_stem(path);
    let extension = path
        .extension()
        .map(|extension| format!(".{}", extension.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|counter| path.with_file_name(format!("{stem}_{counter}{extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Print file name for `video`.
///
/// The explicit name is used only when `use_explicit_name` is set; a name
/// without a `.png`/`.jpg` extension gets the frame format's extension.
pub fn output_file_name(video: &Path, settings: &PrintSettings, use_explicit_name: bool) -> String {
    let frame_extension = settings.extraction.output_format.extension();
    match settings.output_filename.as_deref().filter(|_| use_explicit_name) {
        Some(name) if OutputFormat::from_path(Path::new(name)).is_some() => name.to_string(),
        Some(name) => format!("{name}.{frame_extension}"),
        None => format!("{}{}.{frame_extension}", file_stem(video), settings.output_suffix),
    }
}

/// Rotate each frame file in place, recording failures on the record.
fn rotate_frames(records: &mut [FrameRecord], rotation: Rotation, warnings: &mut Vec<String>) {
    if rotation == Rotation::None {
        return;
    }
    log::info!("Rotating {} frames by {} degrees", records.len(), rotation.degrees());
    for record in records.iter_mut() {
        if let Err(error) = rotate_file_in_place(&record.path, rotation) {
            let message = format!("could not rotate {}: {error}", record.path.display());
            log::warn!("{message}");
            warnings.push(message);
            record.rotation_error = Some(error.to_string());
        }
    }
}

fn remove_unselected(work_dir: &WorkDir, all: &[PathBuf], kept: &[FrameRecord]) {
    if !work_dir.is_temporary() {
        return;
    }
    let kept: BTreeSet<&Path> = kept.iter().map(|record| record.path.as_path()).collect();
    for path in all.iter().filter(|path| !kept.contains(path.as_path())) {
        if let Err(error) = fs::remove_file(path) {
            log::warn!("Could not remove unselected frame {}: {error}", path.display());
        }
    }
}

/// Produce one print for `video`, written to
/// `settings.output_dir/output_name`.
///
/// Unless overwriting is enabled, an existing file makes the print land on
/// the next free `_1`, `_2`, ... name.
///
/// # Errors
///
/// - [`MoviePrintError::InvalidParameters`] for invalid settings.
/// - [`MoviePrintError::ExtractionFailed`] /
///   [`MoviePrintError::CapabilityMissing`] from extraction.
/// - [`MoviePrintError::NoFramesExtracted`] when extraction found nothing.
/// - [`MoviePrintError::NoPlaceableImages`] when nothing survived
///   filtering.
/// - [`MoviePrintError::CompositionFailed`] when the print could not be
///   written.
pub fn process_video(
    video: &Path,
    settings: &PrintSettings,
    output_name: &str,
) -> Result<PrintOutcome, MoviePrintError> {
    settings.validate()?;
    log::info!("Processing {}", video.display());

    let work_dir = WorkDir::for_video(video, settings.frame_root.as_deref())?;
    let records = extract(video, work_dir.path(), &settings.extraction)?;
    if records.is_empty() {
        return Err(MoviePrintError::NoFramesExtracted {
            video: video.to_path_buf(),
        });
    }
    let frames_extracted = records.len();
    let window = VideoProbe::probe(video)
        .ok()
        .and_then(|info| TimeWindow::resolve(&settings.extraction, &info).ok());

    let filtered = apply_exclusions(records, &settings.exclusions);
    let mut warnings = filtered.warnings.clone();
    let mut records = filtered.records;

    if settings.layout.mode == LayoutMode::Grid && settings.max_frames_for_print.is_some() {
        let all: Vec<PathBuf> = records.iter().map(|record| record.path.clone()).collect();
        records = sample(records, settings.max_frames_for_print);
        remove_unselected(&work_dir, &all, &records);
    }
    if records.is_empty() {
        return Err(MoviePrintError::NoPlaceableImages);
    }

    rotate_frames(&mut records, settings.layout.rotation, &mut warnings);

    let mut layout = settings.layout.clone().with_rotation(Rotation::None);
    if layout.header_height > 0 && layout.header_text.is_none() {
        let name = video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        layout.header_text = Some(match window {
            Some(window) => format!(
                "{name}  {} - {}",
                format_timecode_short(window.start),
                format_timecode_short(window.end)
            ),
            None => name,
        });
    }

    let label_content = layout.label.as_ref().map(|style| style.content);
    let thumbnails: Vec<Thumbnail> = records
        .iter()
        .map(|record| Thumbnail::from_record(record, label_content))
        .collect();

    fs::create_dir_all(&settings.output_dir)?;
    let requested = settings.output_dir.join(output_name);
    let print_path = if settings.overwrite {
        requested
    } else {
        let unique = unique_output_path(&requested);
        if unique != requested {
            log::warn!(
                "{} already exists; writing {} instead",
                requested.display(),
                unique.display()
            );
        }
        unique
    };

    let options = CompositionOptions {
        overwrite: settings.overwrite,
        max_output_kib: settings.max_output_kib,
    };
    let print = compose_with_options(&thumbnails, &layout, &print_path, options)?;
    warnings.extend(
        print
            .skipped
            .iter()
            .map(|path| format!("could not read {}", path.display())),
    );

    let sidecar_path = if settings.save_sidecar {
        let parameters = GenerationParameters {
            extraction: settings.extraction.clone(),
            layout: settings.layout.clone(),
            window,
            max_frames_for_print: settings.max_frames_for_print,
            exclusion_warnings: filtered.warnings,
            actual_frames_in_print: print.items.len(),
        };
        let path = Sidecar::path_for(&print.path);
        Sidecar::new(&print.path, video, parameters, &records, &print.items).write(&path)?;
        Some(path)
    } else {
        None
    };

    log::info!(
        "{}: {} of {} frames on {}",
        video.display(),
        print.items.len(),
        frames_extracted,
        print.path.display()
    );
    Ok(PrintOutcome {
        video: video.to_path_buf(),
        print_path: print.path,
        sidecar_path,
        frames_extracted,
        frames_in_print: print.items.len(),
        warnings,
    })
}

/// Discover videos in `inputs` and make one print per video.
///
/// A failing video is logged and recorded in the report; the batch goes on.
/// The explicit output file name applies only when the sole input is a
/// video file.
///
/// # Errors
///
/// Fails only before processing starts: invalid settings or
/// [`MoviePrintError::NoVideoFound`].
pub fn run_batch<P: AsRef<Path>>(
    inputs: &[P],
    settings: &PrintSettings,
    progress: Arc<dyn ProgressCallback>,
) -> Result<BatchReport, MoviePrintError> {
    settings.validate()?;
    let videos = discover_videos(inputs, &settings.video_extensions, settings.recursive)?;

    let single_file = inputs.len() == 1 && inputs[0].as_ref().is_file();
    if settings.output_filename.is_some() && !single_file {
        log::warn!("An explicit output file name needs a single video file input; using generated names");
    }

    let mut tracker = BatchTracker::new(progress, videos.len());
    let mut report = BatchReport::default();
    for video in &videos {
        tracker.start_video(video);
        let name = output_file_name(video, settings, single_file);
        match process_video(video, settings, &name) {
            Ok(outcome) => report.succeeded.push((outcome.video, outcome.print_path)),
            Err(error) => {
                log::error!("{}: {error}", video.display());
                report.failed.push((video.clone(), error.to_string()));
            }
        }
    }
    tracker.finish();

    log::info!(
        "Batch finished: {} succeeded, {} failed",
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(report)
}
