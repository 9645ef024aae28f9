//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Parallel directory walking with a bounded worker pool
//! - Streaming content fingerprints with BLAKE3
//! - An explicit completion barrier for the walker pool
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: BLAKE3 file hashing (streaming)
//! - [`barrier`]: Counting barrier that tracks outstanding directory tasks
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::scanner::{ScanEvent, Walker, WalkerConfig};
//! use std::path::PathBuf;
//!
//! let config = WalkerConfig::default().with_min_size(1024);
//! let walker = Walker::new(vec![PathBuf::from(".")], config);
//! let (tx, rx) = crossbeam_channel::bounded(64);
//!
//! std::thread::spawn(move || walker.run(tx));
//! for event in rx {
//!     if let ScanEvent::File(record) = event {
//!         println!("{}: {} bytes", record.path.display(), record.size);
//!     }
//! }
//! ```

pub mod barrier;
pub mod hasher;
pub mod walker;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::Serialize;

// Re-export main types
pub use barrier::CompletionBarrier;
pub use hasher::{hash_to_hex, Digest, Hasher};
pub use walker::{WalkStats, Walker};

/// Default threshold below which files are never considered (16 KiB).
pub const DEFAULT_MIN_SIZE: u64 = 16 * 1024;

/// Default capacity of the bounded channel between walker and aggregator.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Composite content key: exact byte size plus content digest.
///
/// Two files are duplicates exactly when their fingerprints are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint {
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 digest of the full content
    pub digest: Digest,
}

impl Fingerprint {
    /// Create a fingerprint from a size and a digest.
    #[must_use]
    pub fn new(size: u64, digest: Digest) -> Self {
        Self { size, digest }
    }

    /// Digest as a lowercase hexadecimal string.
    #[must_use]
    pub fn digest_hex(&self) -> String {
        hash_to_hex(&self.digest)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.size, self.digest_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One qualifying file discovered during traversal.
///
/// Created by a walker worker once the file has passed the size filter and
/// been fully read. Immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Size and content digest
    pub fingerprint: Fingerprint,
    /// File size in bytes at scan time
    pub size: u64,
}

impl FileRecord {
    /// Create a new record. The size is taken from the fingerprint.
    #[must_use]
    pub fn new(path: PathBuf, fingerprint: Fingerprint) -> Self {
        Self {
            path,
            size: fingerprint.size,
            fingerprint,
        }
    }
}

/// Item sent from walker workers to the aggregator.
#[derive(Debug)]
pub enum ScanEvent {
    /// A fingerprinted regular file.
    File(FileRecord),
    /// A symlink that was skipped. Only its resolved target is recorded.
    Link {
        /// Path of the symlink itself
        link: PathBuf,
        /// Absolute path the symlink points at
        target: PathBuf,
    },
    /// A directory or file that could not be processed.
    Error(ScanError),
}

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Files whose size is at or below this many bytes are ignored.
    pub min_size: u64,

    /// Number of worker threads pulling directory tasks.
    pub threads: usize,

    /// Capacity of the bounded output channel.
    pub channel_capacity: usize,

    /// Cooperative cancellation flag.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            threads: default_threads(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            shutdown_flag: None,
        }
    }
}

impl WalkerConfig {
    /// Set the minimum size threshold.
    #[must_use]
    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Set the number of walker threads (at least one).
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Set the output channel capacity (at least one).
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

/// Number of walker threads used when none is configured.
#[must_use]
pub fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when listing a directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The directory vanished before it could be read.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Any other failure while reading a directory.
    #[error("Traversal error for {path}: {source}")]
    Traversal {
        /// Directory where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A file could not be fingerprinted.
    #[error(transparent)]
    Hash(#[from] HashError),
}

impl ScanError {
    /// Classify an I/O error raised while reading `path` as a directory.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Traversal {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p) | Self::NotFound(p) | Self::NotADirectory(p) => p,
            Self::Traversal { path, .. } => path,
            Self::Hash(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared before it could be read.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Hashing stopped because shutdown was requested.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while reading `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Interrupted(p) => p,
            Self::Io { path, .. } => path,
        }
    }
}
