//! Directory walker built on a bounded pool of worker threads.
//!
//! # Overview
//!
//! The [`Walker`] enumerates every regular file under a set of roots,
//! fingerprints the ones above the size threshold and sends a
//! [`ScanEvent`] per file to a caller-supplied bounded channel.
//!
//! # Scheduling
//!
//! - Directory tasks live in an unbounded work queue shared by a fixed
//!   number of worker threads.
//! - A worker that finishes listing a directory keeps going with its first
//!   subdirectory and enqueues the others.
//! - A [`CompletionBarrier`] counts outstanding directory tasks. Children are
//!   registered before the parent releases its own unit, so the count only
//!   reaches zero once the whole forest has been visited.
//! - Once the barrier is clear, one stop message per worker ends the pool.
//!
//! Symbolic links are never followed and never fingerprinted. Their resolved
//! targets are reported as [`ScanEvent::Link`] so the replacement step can
//! prefer files that existing links already point at.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{ScanEvent, Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let walker = Walker::new(vec![PathBuf::from("/data")], WalkerConfig::default());
//! let (tx, rx) = crossbeam_channel::bounded(64);
//! let handle = std::thread::spawn(move || rx.iter().count());
//! let stats = walker.run(tx).unwrap();
//! println!("{} files hashed, {} events", stats.files_hashed, handle.join().unwrap());
//! ```

use std::fs::{self, DirEntry};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use super::barrier::CompletionBarrier;
use super::{FileRecord, HashError, Hasher, ScanError, ScanEvent, WalkerConfig};
use crate::progress::ProgressCallback;

/// Message on the work queue.
#[derive(Debug)]
enum WorkItem {
    /// Walk this directory.
    Scan(PathBuf),
    /// No work remains; exit the worker loop.
    Stop,
}

/// Errors that prevent the walker from running at all.
#[derive(thiserror::Error, Debug)]
pub enum WalkError {
    /// Not a single worker thread could be started.
    #[error("failed to spawn walker threads: {0}")]
    Spawn(#[source] io::Error),
}

/// Counters collected while walking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories successfully listed
    pub directories: usize,
    /// Files fingerprinted and emitted
    pub files_hashed: usize,
    /// Total bytes read while fingerprinting
    pub bytes_hashed: u64,
    /// Symbolic links skipped
    pub symlinks_skipped: usize,
    /// Regular files at or below the size threshold
    pub small_files_skipped: usize,
    /// FIFOs, sockets and device nodes
    pub special_files_skipped: usize,
    /// Errors emitted to the output channel
    pub errors: usize,
    /// Directory tasks that panicked
    pub worker_panics: usize,
    /// Whether the walk stopped early
    pub interrupted: bool,
}

#[derive(Debug, Default)]
struct SharedStats {
    directories: AtomicUsize,
    files_hashed: AtomicUsize,
    bytes_hashed: AtomicU64,
    symlinks_skipped: AtomicUsize,
    small_files_skipped: AtomicUsize,
    special_files_skipped: AtomicUsize,
    errors: AtomicUsize,
    worker_panics: AtomicUsize,
}

impl SharedStats {
    fn snapshot(&self, interrupted: bool) -> WalkStats {
        WalkStats {
            directories: self.directories.load(Ordering::Relaxed),
            files_hashed: self.files_hashed.load(Ordering::Relaxed),
            bytes_hashed: self.bytes_hashed.load(Ordering::Relaxed),
            symlinks_skipped: self.symlinks_skipped.load(Ordering::Relaxed),
            small_files_skipped: self.small_files_skipped.load(Ordering::Relaxed),
            special_files_skipped: self.special_files_skipped.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            worker_panics: self.worker_panics.load(Ordering::Relaxed),
            interrupted,
        }
    }
}

/// Parallel directory walker over one or more roots.
pub struct Walker {
    roots: Vec<PathBuf>,
    config: WalkerConfig,
    hasher: Hasher,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("roots", &self.roots)
            .field("config", &self.config)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Walker {
    /// Create a walker for the given roots.
    ///
    /// Roots are walked as given; callers that may pass overlapping roots
    /// should normalize them first (see `DuplicateFinder`).
    #[must_use]
    pub fn new(roots: Vec<PathBuf>, config: WalkerConfig) -> Self {
        let mut hasher = Hasher::new();
        if let Some(ref flag) = config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        Self {
            roots,
            config,
            hasher,
            progress_callback: None,
        }
    }

    /// Report each fingerprinted file to a progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk every root and stream events into `out`.
    ///
    /// Blocks until all directory tasks have completed. `out` is dropped
    /// before returning, so a consumer iterating the receiver sees the
    /// channel close once the last worker has exited.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Spawn`] if no worker thread could be started.
    /// Per-directory and per-file failures are sent as
    /// [`ScanEvent::Error`] instead.
    pub fn run(&self, out: Sender<ScanEvent>) -> Result<WalkStats, WalkError> {
        let (work_tx, work_rx) = crossbeam_channel::unbounded::<WorkItem>();
        let barrier = CompletionBarrier::new();
        let stats = SharedStats::default();
        let closed = AtomicBool::new(false);

        barrier.add(self.roots.len());
        for root in &self.roots {
            log::debug!("Seeding walk root {}", root.display());
            // The receiver is held locally, so the send cannot fail.
            let _ = work_tx.send(WorkItem::Scan(root.clone()));
        }

        let threads = self.config.threads.max(1);
        log::info!(
            "Walking {} root(s) with {} worker thread(s)",
            self.roots.len(),
            threads
        );

        let result = thread::scope(|s| {
            let mut handles = Vec::with_capacity(threads);
            for id in 0..threads {
                let worker = Worker {
                    id,
                    walker: self,
                    work_rx: work_rx.clone(),
                    work_tx: work_tx.clone(),
                    out: out.clone(),
                    barrier: barrier.clone(),
                    stats: &stats,
                    closed: &closed,
                };
                match thread::Builder::new()
                    .name(format!("walker-{id}"))
                    .spawn_scoped(s, move || worker.run())
                {
                    Ok(handle) => handles.push(handle),
                    Err(e) if handles.is_empty() => return Err(WalkError::Spawn(e)),
                    Err(e) => {
                        log::warn!("Spawned only {} of {} walker threads: {}", id, threads, e);
                        break;
                    }
                }
            }

            barrier.wait();
            log::debug!("All directory tasks complete, stopping walker pool");

            for _ in 0..handles.len() {
                let _ = work_tx.send(WorkItem::Stop);
            }
            for handle in handles {
                if handle.join().is_err() {
                    stats.worker_panics.fetch_add(1, Ordering::Relaxed);
                }
            }
            Ok(())
        });
        drop(out);
        result?;

        let interrupted = self.is_shutdown_requested();
        let snapshot = stats.snapshot(interrupted);
        log::info!(
            "Walk finished: {} directories, {} files hashed, {} errors",
            snapshot.directories,
            snapshot.files_hashed,
            snapshot.errors
        );
        Ok(snapshot)
    }
}

/// One pool thread plus the shared state it needs.
struct Worker<'a> {
    id: usize,
    walker: &'a Walker,
    work_rx: Receiver<WorkItem>,
    work_tx: Sender<WorkItem>,
    out: Sender<ScanEvent>,
    barrier: CompletionBarrier,
    stats: &'a SharedStats,
    closed: &'a AtomicBool,
}

impl Worker<'_> {
    fn run(self) {
        log::trace!("Walker worker {} starting", self.id);

        while let Ok(item) = self.work_rx.recv() {
            let dir = match item {
                WorkItem::Scan(dir) => dir,
                WorkItem::Stop => break,
            };
            // Registered by whoever enqueued it; released when this task ends.
            let _task = self.barrier.adopt();

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.walk_from(dir)));
            if outcome.is_err() {
                self.stats.worker_panics.fetch_add(1, Ordering::Relaxed);
                log::error!("Walker worker {} panicked while walking a directory", self.id);
            }
        }

        log::trace!("Walker worker {} exiting", self.id);
    }

    fn should_stop(&self) -> bool {
        self.closed.load(Ordering::Relaxed) || self.walker.is_shutdown_requested()
    }

    /// Walk `dir`, then keep descending into the first subdirectory while
    /// handing its siblings to the pool.
    fn walk_from(&self, mut dir: PathBuf) {
        loop {
            if self.should_stop() {
                return;
            }

            let mut subdirs = self.scan_directory(&dir).into_iter();
            let Some(next) = subdirs.next() else {
                return;
            };

            let siblings: Vec<PathBuf> = subdirs.collect();
            self.barrier.add(siblings.len());
            for sibling in siblings {
                if self.work_tx.send(WorkItem::Scan(sibling)).is_err() {
                    self.barrier.done();
                }
            }

            dir = next;
        }
    }

    /// List one directory, emit its qualifying files and return its
    /// subdirectories in name order.
    fn scan_directory(&self, dir: &Path) -> Vec<PathBuf> {
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) => {
                let err = ScanError::from_io(dir, e);
                log::warn!("Cannot read directory: {}", err);
                self.emit_error(err);
                return Vec::new();
            }
        };
        self.stats.directories.fetch_add(1, Ordering::Relaxed);

        let mut entries: Vec<DirEntry> = Vec::new();
        for entry in read_dir {
            match entry {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    let err = ScanError::from_io(dir, e);
                    log::warn!("Failed to read entry in {}: {}", dir.display(), err);
                    self.emit_error(err);
                }
            }
        }
        entries.sort_by_key(DirEntry::file_name);

        let mut subdirs = Vec::new();
        for entry in entries {
            if self.should_stop() {
                break;
            }

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    self.emit_error(ScanError::from_io(&path, e));
                    continue;
                }
            };

            if file_type.is_symlink() {
                self.record_symlink(path);
            } else if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                self.process_file(&entry, path);
            } else {
                log::trace!("Skipping special file: {}", path.display());
                self.stats
                    .special_files_skipped
                    .fetch_add(1, Ordering::Relaxed);
            }
        }

        subdirs
    }

    fn process_file(&self, entry: &DirEntry, path: PathBuf) {
        // DirEntry::metadata does not traverse symlinks.
        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                let err = ScanError::Hash(HashError::from_io(&path, e));
                log::warn!("Cannot stat file: {}", err);
                self.emit_error(err);
                return;
            }
        };

        if size <= self.walker.config.min_size {
            log::trace!("Skipping small file ({} bytes): {}", size, path.display());
            self.stats
                .small_files_skipped
                .fetch_add(1, Ordering::Relaxed);
            return;
        }

        match self.walker.hasher.fingerprint(&path, size) {
            Ok(fingerprint) => {
                let current = self.stats.files_hashed.fetch_add(1, Ordering::Relaxed) + 1;
                self.stats.bytes_hashed.fetch_add(size, Ordering::Relaxed);
                if let Some(ref callback) = self.walker.progress_callback {
                    callback.on_progress(current, path.to_string_lossy().as_ref());
                    callback.on_item_completed(size);
                }
                self.emit(ScanEvent::File(FileRecord::new(path, fingerprint)));
            }
            Err(HashError::Interrupted(p)) => {
                log::debug!("Hashing interrupted: {}", p.display());
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                self.emit_error(ScanError::Hash(e));
            }
        }
    }

    fn record_symlink(&self, link: PathBuf) {
        log::trace!("Skipping symlink: {}", link.display());
        self.stats.symlinks_skipped.fetch_add(1, Ordering::Relaxed);

        // Dangling links have no target worth recording.
        if let Ok(target) = fs::canonicalize(&link) {
            self.emit(ScanEvent::Link { link, target });
        }
    }

    fn emit_error(&self, error: ScanError) {
        self.stats.errors.fetch_add(1, Ordering::Relaxed);
        self.emit(ScanEvent::Error(error));
    }

    /// Send an event, blocking while the channel is full.
    fn emit(&self, event: ScanEvent) {
        if self.out.send(event).is_err() && !self.closed.swap(true, Ordering::Relaxed) {
            log::warn!("Scan consumer hung up; abandoning remaining work");
        }
    }
}
