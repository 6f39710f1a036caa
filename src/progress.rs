//! Batch progress reporting.
//!
//! [`run_batch`](crate::run_batch) calls a [`ProgressCallback`] before each
//! video and once more when the batch is done. Callbacks observe; they
//! cannot stop the batch.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use movieprint::{
//!     ExtractionSpec, LayoutSpec, PrintSettings, ProgressCallback, ProgressInfo, run_batch,
//! };
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         match &info.video {
//!             Some(video) => println!("[{}/{}] {}", info.current, info.total, video.display()),
//!             None => println!("done in {:.1?}", info.elapsed),
//!         }
//!     }
//! }
//!
//! let settings = PrintSettings::new(
//!     ExtractionSpec::interval_seconds(10.0).build()?,
//!     LayoutSpec::grid().build()?,
//!     "prints/",
//! )?;
//! let report = run_batch(&["movies/"], &settings, Arc::new(PrintProgress))?;
//! println!("{} ok, {} failed", report.succeeded.len(), report.failed.len());
//! # Ok::<(), movieprint::MoviePrintError>(())
//! ```

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

/// A snapshot of batch progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Videos started so far, including the current one.
    pub current: usize,
    /// Videos in the batch.
    pub total: usize,
    /// The video about to be processed; `None` on the final update.
    pub video: Option<PathBuf>,
    /// Wall-clock time since the batch started.
    pub elapsed: Duration,
}

impl ProgressInfo {
    /// Completion percentage of started videos (0.0 – 100.0).
    pub fn percentage(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.current as f32 / self.total as f32 * 100.0
    }
}

/// Receives batch progress updates.
///
/// Implementations must be [`Send`] and [`Sync`] so a GUI can hand the
/// batch to a worker thread.
pub trait ProgressCallback: Send + Sync {
    /// Called before each video and once after the last one.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks a batch and forwards updates to the callback.
pub(crate) struct BatchTracker {
    callback: Arc<dyn ProgressCallback>,
    total: usize,
    current: usize,
    started: Instant,
}

impl BatchTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: usize) -> Self {
        Self {
            callback,
            total,
            current: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn start_video(&mut self, video: &Path) {
        self.current += 1;
        self.report(Some(video.to_path_buf()));
    }

    pub(crate) fn finish(&mut self) {
        self.current = self.total;
        self.report(None);
    }

    fn report(&self, video: Option<PathBuf>) {
        self.callback.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            video,
            elapsed: self.started.elapsed(),
        });
    }
}
