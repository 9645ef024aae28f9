//! Replace duplicate files with symbolic links to one canonical copy.
//!
//! # Overview
//!
//! For every [`DuplicateGroup`] one member is kept and every other member is
//! swapped for a symlink pointing at it. Each swap goes through a temporary
//! link so the original is never removed before its replacement exists:
//!
//! 1. Re-check the duplicate without following links
//! 2. Optionally re-hash it against the group fingerprint
//! 3. Create a symlink at a unique temporary name in the same directory
//! 4. Confirm the temporary link resolves to the canonical file
//! 5. Re-apply the duplicate's permission bits through the link
//! 6. Rename the temporary link over the duplicate
//!
//! Any failure from step 3 on removes the temporary link and leaves the
//! duplicate untouched. Failures are recorded per file and never stop the
//! remaining members or groups.
//!
//! # Permissions
//!
//! Symlinks carry no permission bits of their own on Unix, so step 5 changes
//! the mode of the canonical file. With several duplicates the last one
//! processed wins. If the rename fails, the canonical file gets its previous
//! mode back.
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::actions::link::{link_groups, LinkConfig};
//! use linkdupe::duplicates::DuplicateFinder;
//! use std::path::PathBuf;
//!
//! let result = DuplicateFinder::with_defaults()
//!     .find_duplicates(&[PathBuf::from(".")])
//!     .unwrap();
//! let report = link_groups(&result.groups, &result.link_targets, &LinkConfig::default());
//! println!("{}", report.summary());
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::duplicates::DuplicateGroup;
use crate::progress::{ProgressCallback, PHASE_LINKING};
use crate::scanner::{Digest, HashError, Hasher};

/// Attempts made to find a free temporary name before giving up.
const TEMP_NAME_ATTEMPTS: usize = 8;

static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Error type for link replacement.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The file chosen to keep is gone, no longer a regular file, or resized.
    #[error("canonical file changed since scan: {0}")]
    CanonicalChanged(PathBuf),

    /// The duplicate is no longer a regular file of the scanned size.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// Re-hashing found different content.
    #[error("content of {path} no longer matches {canonical}")]
    ContentMismatch {
        /// Duplicate that was re-hashed
        path: PathBuf,
        /// File it was supposed to match
        canonical: PathBuf,
    },

    /// The temporary symlink could not be created.
    #[error("failed to create temporary link {path}: {source}")]
    TempLink {
        /// Temporary link path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The temporary symlink does not resolve to the canonical file.
    #[error("temporary link {path} does not resolve to {expected}")]
    Verify {
        /// Temporary link path
        path: PathBuf,
        /// Path the link should resolve to
        expected: PathBuf,
    },

    /// Permission bits could not be applied.
    #[error("failed to set permissions on {path}: {source}")]
    Permissions {
        /// Path whose mode was being set
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The temporary link could not be renamed over the duplicate.
    #[error("failed to rename link over {path}: {source}")]
    Rename {
        /// Duplicate path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A file could not be inspected.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Re-hashing failed.
    #[error(transparent)]
    Hash(HashError),

    /// Shutdown was requested while the file was processed.
    #[error("interrupted while processing {0}")]
    Interrupted(PathBuf),
}

impl LinkError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::CanonicalChanged(p) | Self::Modified(p) | Self::Interrupted(p) => p,
            Self::ContentMismatch { path, .. }
            | Self::TempLink { path, .. }
            | Self::Verify { path, .. }
            | Self::Permissions { path, .. }
            | Self::Rename { path, .. }
            | Self::Io { path, .. } => path,
            Self::Hash(e) => e.path(),
        }
    }
}

impl From<HashError> for LinkError {
    fn from(err: HashError) -> Self {
        match err {
            HashError::Interrupted(p) => Self::Interrupted(p),
            other => Self::Hash(other),
        }
    }
}

/// What happened to one duplicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Replaced by a symlink to the canonical file.
    Linked,
    /// Already a symlink to the canonical file.
    AlreadyLinked,
    /// Dry run: would have been replaced.
    Planned,
}

/// One duplicate that could not be replaced.
#[derive(Debug)]
pub struct LinkFailure {
    /// Duplicate that was left as is
    pub path: PathBuf,
    /// Why it was left
    pub error: LinkError,
}

/// Aggregate outcome of a replacement pass.
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Groups with two or more members that were visited
    pub groups_processed: usize,
    /// Duplicates replaced by symlinks
    pub linked: usize,
    /// Duplicates that already pointed at the canonical file
    pub already_linked: usize,
    /// Duplicates that would be replaced (dry run only)
    pub planned: usize,
    /// Bytes reclaimed by the replacements
    pub bytes_reclaimed: u64,
    /// Duplicates left untouched because of an error
    pub failures: Vec<LinkFailure>,
    /// Whether the pass stopped early on shutdown
    pub interrupted: bool,
}

impl LinkReport {
    /// Check if every duplicate was handled.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && !self.interrupted
    }

    /// Number of failed replacements.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Human-readable summary of the pass.
    #[must_use]
    pub fn summary(&self) -> String {
        let reclaimed = bytesize::ByteSize(self.bytes_reclaimed);
        if self.planned > 0 {
            format!("Dry run: {} file(s) would be linked", self.planned)
        } else if self.failures.is_empty() {
            format!(
                "Linked {} file(s), {} already linked, saved {} bytes ({})",
                self.linked, self.already_linked, self.bytes_reclaimed, reclaimed
            )
        } else {
            format!(
                "Linked {} file(s), {} already linked, {} skipped due to errors, saved {} bytes ({})",
                self.linked,
                self.already_linked,
                self.failures.len(),
                self.bytes_reclaimed,
                reclaimed
            )
        }
    }

    fn record(&mut self, path: &Path, size: u64, result: Result<LinkOutcome, LinkError>) {
        match result {
            Ok(LinkOutcome::Linked) => {
                self.linked += 1;
                self.bytes_reclaimed += size;
            }
            Ok(LinkOutcome::AlreadyLinked) => self.already_linked += 1,
            Ok(LinkOutcome::Planned) => self.planned += 1,
            Err(LinkError::Interrupted(_)) => self.interrupted = true,
            Err(error) => {
                log::warn!("Skipping {}: {}", path.display(), error);
                self.failures.push(LinkFailure {
                    path: path.to_path_buf(),
                    error,
                });
            }
        }
    }
}

/// Configuration for the replacement pass.
#[derive(Clone, Default)]
pub struct LinkConfig {
    /// Report only, never touch the filesystem.
    pub dry_run: bool,
    /// Re-hash each duplicate and the canonical file before replacing.
    pub verify_content: bool,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConfig")
            .field("dry_run", &self.dry_run)
            .field("verify_content", &self.verify_content)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl LinkConfig {
    /// Report planned replacements without performing them.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Re-hash files before replacing them.
    #[must_use]
    pub fn with_verify_content(mut self, verify: bool) -> Self {
        self.verify_content = verify;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
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

    fn hasher(&self) -> Hasher {
        match self.shutdown_flag {
            Some(ref flag) => Hasher::new().with_shutdown_flag(Arc::clone(flag)),
            None => Hasher::new(),
        }
    }
}

/// Replace the duplicates of every group, one group at a time.
///
/// `link_targets` holds the resolved targets of symlinks seen during the
/// scan; a member found there is kept in preference to the first member.
#[must_use]
pub fn link_groups(
    groups: &[DuplicateGroup],
    link_targets: &HashSet<PathBuf>,
    config: &LinkConfig,
) -> LinkReport {
    let mut report = LinkReport::default();
    let actionable: Vec<&DuplicateGroup> = groups.iter().filter(|g| g.has_duplicates()).collect();

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start(PHASE_LINKING, actionable.len());
    }

    for (index, group) in actionable.into_iter().enumerate() {
        if config.is_shutdown_requested() {
            report.interrupted = true;
            break;
        }
        if let Some(ref callback) = config.progress_callback {
            let first = group.members[0].to_string_lossy();
            callback.on_progress(index + 1, first.as_ref());
        }

        link_group(group, link_targets, config, &mut report);
        if report.interrupted {
            break;
        }
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end(PHASE_LINKING);
    }

    if report.interrupted {
        log::warn!("Linking interrupted; remaining groups left untouched");
    }
    log::info!("{}", report.summary());
    report
}

/// Replace every non-canonical member of one group.
pub fn link_group(
    group: &DuplicateGroup,
    link_targets: &HashSet<PathBuf>,
    config: &LinkConfig,
    report: &mut LinkReport,
) {
    if !group.has_duplicates() {
        return;
    }
    report.groups_processed += 1;

    let keep = group.canonical_index(link_targets);
    let canonical_path = &group.members[keep];
    let duplicates = group
        .members
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != keep)
        .map(|(_, p)| p);

    let canonical = match resolve_canonical(canonical_path, group, config) {
        Ok(resolved) => resolved,
        Err(LinkError::Interrupted(_)) => {
            report.interrupted = true;
            return;
        }
        Err(err) => {
            log::warn!("Skipping group of {}: {}", canonical_path.display(), err);
            for dup in duplicates {
                report.record(
                    dup,
                    group.size,
                    Err(LinkError::CanonicalChanged(canonical_path.clone())),
                );
            }
            return;
        }
    };
    log::debug!(
        "Keeping {} for {} duplicate(s)",
        canonical.display(),
        group.duplicate_count()
    );

    for dup in duplicates {
        if config.is_shutdown_requested() {
            report.interrupted = true;
            return;
        }
        let result = replace_with_symlink(dup, &canonical, group, config);
        report.record(dup, group.size, result);
        if report.interrupted {
            return;
        }
    }
}

/// Resolve the kept member and make sure it still matches the group.
fn resolve_canonical(
    path: &Path,
    group: &DuplicateGroup,
    config: &LinkConfig,
) -> Result<PathBuf, LinkError> {
    let meta = fs::symlink_metadata(path).map_err(|_| LinkError::CanonicalChanged(path.into()))?;
    if !meta.file_type().is_file() || meta.len() != group.size {
        return Err(LinkError::CanonicalChanged(path.to_path_buf()));
    }
    let resolved = fs::canonicalize(path).map_err(|e| LinkError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if config.verify_content && !config.dry_run {
        let digest = config.hasher().full_hash(&resolved)?;
        if digest != group.fingerprint.digest {
            return Err(LinkError::CanonicalChanged(path.to_path_buf()));
        }
    }
    Ok(resolved)
}

/// Swap one duplicate for a symlink to `canonical`.
///
/// `canonical` must already be resolved to an absolute path.
///
/// # Errors
///
/// Returns [`LinkError`] if the duplicate changed since the scan or any
/// filesystem step fails. The duplicate is left in place on error.
pub fn replace_with_symlink(
    duplicate: &Path,
    canonical: &Path,
    group: &DuplicateGroup,
    config: &LinkConfig,
) -> Result<LinkOutcome, LinkError> {
    let meta = fs::symlink_metadata(duplicate).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LinkError::Modified(duplicate.to_path_buf()),
        _ => LinkError::Io {
            path: duplicate.to_path_buf(),
            source: e,
        },
    })?;

    if meta.file_type().is_symlink() {
        return match fs::canonicalize(duplicate) {
            Ok(target) if target == canonical => {
                log::debug!("Already linked: {}", duplicate.display());
                Ok(LinkOutcome::AlreadyLinked)
            }
            _ => Err(LinkError::Modified(duplicate.to_path_buf())),
        };
    }
    if !meta.file_type().is_file() || meta.len() != group.size {
        return Err(LinkError::Modified(duplicate.to_path_buf()));
    }

    if config.dry_run {
        return Ok(LinkOutcome::Planned);
    }

    if config.verify_content {
        verify_digest(duplicate, canonical, &group.fingerprint.digest, config)?;
    }

    let permissions = meta.permissions();
    let temp = create_temp_link(duplicate, canonical)?;

    if let Err(err) = finish_replacement(&temp, duplicate, canonical, permissions) {
        if let Err(cleanup) = fs::remove_file(&temp) {
            log::warn!(
                "Failed to remove temporary link {}: {}",
                temp.display(),
                cleanup
            );
        }
        return Err(err);
    }

    log::debug!("Linked {} -> {}", duplicate.display(), canonical.display());
    Ok(LinkOutcome::Linked)
}

fn verify_digest(
    duplicate: &Path,
    canonical: &Path,
    expected: &Digest,
    config: &LinkConfig,
) -> Result<(), LinkError> {
    let digest = config.hasher().full_hash(duplicate)?;
    if &digest != expected {
        return Err(LinkError::ContentMismatch {
            path: duplicate.to_path_buf(),
            canonical: canonical.to_path_buf(),
        });
    }
    Ok(())
}

/// Steps 4 to 6 of the protocol. The caller removes `temp` on error.
fn finish_replacement(
    temp: &Path,
    duplicate: &Path,
    canonical: &Path,
    permissions: fs::Permissions,
) -> Result<(), LinkError> {
    match fs::canonicalize(temp) {
        Ok(resolved) if resolved == canonical => {}
        _ => {
            return Err(LinkError::Verify {
                path: temp.to_path_buf(),
                expected: canonical.to_path_buf(),
            })
        }
    }

    let previous = fs::metadata(canonical)
        .map_err(|e| LinkError::Io {
            path: canonical.to_path_buf(),
            source: e,
        })?
        .permissions();

    fs::set_permissions(temp, permissions).map_err(|e| LinkError::Permissions {
        path: temp.to_path_buf(),
        source: e,
    })?;

    fs::rename(temp, duplicate).map_err(|e| {
        if let Err(restore) = fs::set_permissions(canonical, previous) {
            log::warn!(
                "Failed to restore permissions on {}: {}",
                canonical.display(),
                restore
            );
        }
        LinkError::Rename {
            path: duplicate.to_path_buf(),
            source: e,
        }
    })
}

/// Create a symlink to `canonical` at a fresh hidden name next to
/// `duplicate`.
fn create_temp_link(duplicate: &Path, canonical: &Path) -> Result<PathBuf, LinkError> {
    let mut last_err = None;
    for _ in 0..TEMP_NAME_ATTEMPTS {
        let temp = temp_link_path(duplicate);
        match create_symlink(canonical, &temp) {
            Ok(()) => return Ok(temp),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                last_err = Some((temp, e));
            }
            Err(e) => return Err(LinkError::TempLink { path: temp, source: e }),
        }
    }

    let (path, source) = last_err.unwrap_or_else(|| {
        (
            temp_link_path(duplicate),
            io::Error::from(io::ErrorKind::AlreadyExists),
        )
    });
    Err(LinkError::TempLink { path, source })
}

/// Temporary name `.linkdupe-<pid>-<n>.tmp` in the duplicate's directory.
///
/// The name does not depend on the duplicate's own name, which may already
/// be close to the filesystem's length limit.
fn temp_link_path(duplicate: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    duplicate.with_file_name(format!(".linkdupe-{}-{}.tmp", std::process::id(), n))
}

#[cfg(unix)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}
