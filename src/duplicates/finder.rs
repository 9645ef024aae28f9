//! Duplicate finder orchestrating the walker pool and the aggregator.
//!
//! # Overview
//!
//! [`DuplicateFinder::find_duplicates`] runs the detection pipeline:
//! 1. **Roots**: canonicalize the requested roots and drop repeated or
//!    nested ones, so no file can be reached twice
//! 2. **Walk**: the [`Walker`] pool fingerprints every qualifying file and
//!    streams events into a bounded channel
//! 3. **Aggregate**: a dedicated thread drains the channel into groups
//!    keyed by fingerprint
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::PathBuf;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let result = finder.find_duplicates(&[PathBuf::from(".")]).unwrap();
//!
//! println!("Found {} duplicate groups", result.groups.len());
//! println!("Reclaimable: {}", result.summary.reclaimable_display());
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::groups::{is_within, Aggregator, DuplicateGroup};
use crate::progress::{ProgressCallback, PHASE_WALKING};
use crate::scanner::walker::WalkError;
use crate::scanner::{ScanError, ScanEvent, Walker, WalkerConfig};

/// Configuration for the duplicate finder.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Walker configuration (size threshold, pool size, channel capacity).
    pub walker_config: WalkerConfig,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("walker_config", &self.walker_config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl FinderConfig {
    /// Files at or below this size are ignored.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.walker_config = self.walker_config.with_min_size(min_size);
        self
    }

    /// Set the number of walker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.walker_config = self.walker_config.with_threads(threads);
        self
    }

    /// Set the capacity of the walker-to-aggregator channel.
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.walker_config = self.walker_config.with_channel_capacity(capacity);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.walker_config = self.walker_config.with_shutdown_flag(Arc::clone(&flag));
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from a duplicate scan.
#[derive(Debug, Default)]
pub struct ScanSummary {
    /// Roots actually walked after normalization
    pub roots: Vec<PathBuf>,
    /// Files fingerprinted
    pub files_scanned: usize,
    /// Total bytes read while fingerprinting
    pub bytes_hashed: u64,
    /// Directories listed
    pub directories: usize,
    /// Symbolic links skipped
    pub symlinks_skipped: usize,
    /// Files at or below the size threshold
    pub small_files_skipped: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Members that would be replaced by links
    pub duplicate_files: usize,
    /// Bytes reclaimable by linking every duplicate
    pub reclaimable_space: u64,
    /// Non-fatal errors encountered during the scan
    pub scan_errors: Vec<ScanError>,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Duration of the scan
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Reclaimable space as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        bytesize::ByteSize(self.reclaimable_space).to_string()
    }

    /// Whether any file or directory was skipped because of an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty()
    }
}

/// Groups, link targets and statistics produced by one scan.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Groups with two or more members, largest savings first
    pub groups: Vec<DuplicateGroup>,
    /// Resolved targets of symlinks found inside the roots
    pub link_targets: HashSet<PathBuf>,
    /// Scan statistics
    pub summary: ScanSummary,
}

/// Errors that abort a scan.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// None of the requested roots could be used.
    #[error("No usable directory among: {}", display_paths(.0))]
    NoValidRoots(Vec<PathBuf>),

    /// The scan was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Scan interrupted by user")]
    Interrupted,

    /// One or more directory tasks panicked; results would be incomplete.
    #[error("{0} walker task(s) panicked")]
    WorkerPanicked(usize),

    /// The aggregator thread panicked.
    #[error("Aggregator thread panicked")]
    AggregatorPanicked,

    /// A thread could not be started.
    #[error("Failed to spawn aggregator thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// The walker pool could not run.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Canonicalize roots and drop any that repeat or lie inside another.
///
/// Returns the usable roots in their given order plus one error per root
/// that does not exist or is not a directory.
#[must_use]
pub fn normalize_roots(requested: &[PathBuf]) -> (Vec<PathBuf>, Vec<ScanError>) {
    let mut kept: Vec<PathBuf> = Vec::new();
    let mut errors = Vec::new();

    for root in requested {
        let canonical = match std::fs::canonicalize(root) {
            Ok(p) => p,
            Err(e) => {
                let err = ScanError::from_io(root, e);
                log::warn!("Skipping root: {}", err);
                errors.push(err);
                continue;
            }
        };
        if !canonical.is_dir() {
            log::warn!("Skipping root that is not a directory: {}", root.display());
            errors.push(ScanError::NotADirectory(root.clone()));
            continue;
        }

        if let Some(outer) = kept.iter().find(|k| is_within(&canonical, k)) {
            log::warn!(
                "Skipping root {} (already covered by {})",
                root.display(),
                outer.display()
            );
            continue;
        }
        kept.retain(|k| {
            let nested = is_within(k, &canonical);
            if nested {
                log::warn!(
                    "Skipping root {} (already covered by {})",
                    k.display(),
                    canonical.display()
                );
            }
            !nested
        });
        kept.push(canonical);
    }

    (kept, errors)
}

/// Duplicate finder running the walker pool and aggregator together.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// Find every group of identical files under `roots`.
    ///
    /// Unreadable roots, directories and files are recorded in
    /// [`ScanSummary::scan_errors`] and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if:
    /// - no root is a readable directory
    /// - the scan is interrupted by shutdown signal
    /// - a walker task or the aggregator panicked
    /// - the worker threads cannot be started
    pub fn find_duplicates(&self, roots: &[PathBuf]) -> Result<ScanResult, FinderError> {
        let start_time = Instant::now();

        let (roots, root_errors) = normalize_roots(roots);
        if roots.is_empty() {
            return Err(FinderError::NoValidRoots(
                root_errors.iter().map(|e| e.path().to_path_buf()).collect(),
            ));
        }
        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        log::info!("Starting duplicate scan of {}", display_paths(&roots));

        let mut walker = Walker::new(roots.clone(), self.config.walker_config.clone());
        if let Some(ref callback) = self.config.progress_callback {
            walker = walker.with_progress_callback(Arc::clone(callback));
            callback.on_phase_start(PHASE_WALKING, 0);
        }

        let (tx, rx) =
            crossbeam_channel::bounded::<ScanEvent>(self.config.walker_config.channel_capacity);
        let aggregator = thread::Builder::new()
            .name("aggregator".into())
            .spawn(move || Aggregator::new().drain(rx))
            .map_err(FinderError::Spawn)?;

        // `run` drops the sender before returning, which lets the aggregator
        // finish draining.
        let walk = walker.run(tx);
        let aggregated = aggregator.join();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end(PHASE_WALKING);
        }

        let stats = walk?;
        let aggregated = aggregated.map_err(|_| FinderError::AggregatorPanicked)?;

        if stats.worker_panics > 0 {
            return Err(FinderError::WorkerPanicked(stats.worker_panics));
        }
        if stats.interrupted || self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        let aggregate = aggregated.finish();

        let mut scan_errors = root_errors;
        scan_errors.extend(aggregate.errors);

        let summary = ScanSummary {
            roots,
            files_scanned: aggregate.files,
            bytes_hashed: stats.bytes_hashed,
            directories: stats.directories,
            symlinks_skipped: stats.symlinks_skipped,
            small_files_skipped: stats.small_files_skipped,
            duplicate_groups: aggregate.groups.len(),
            duplicate_files: aggregate.groups.iter().map(DuplicateGroup::duplicate_count).sum(),
            reclaimable_space: aggregate
                .groups
                .iter()
                .map(DuplicateGroup::reclaimable_bytes)
                .sum(),
            scan_errors,
            interrupted: false,
            scan_duration: start_time.elapsed(),
        };

        log::info!(
            "Scan complete: {} files, {} duplicate groups, {} reclaimable, {} errors",
            summary.files_scanned,
            summary.duplicate_groups,
            summary.reclaimable_display(),
            summary.scan_errors.len()
        );

        Ok(ScanResult {
            groups: aggregate.groups,
            link_targets: aggregate.link_targets,
            summary,
        })
    }
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("config", &self.config)
            .finish()
    }
}
