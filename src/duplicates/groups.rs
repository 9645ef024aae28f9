//! Duplicate grouping by fingerprint.
//!
//! # Overview
//!
//! The [`Aggregator`] is the single consumer of the walker's output channel.
//! It owns the fingerprint map while traversal runs, so the map needs no
//! locking. Once the channel closes, [`Aggregator::finish`] turns the map into
//! [`DuplicateGroup`]s.
//!
//! # Example
//!
//! ```
//! use linkdupe::duplicates::Aggregator;
//! use linkdupe::scanner::{FileRecord, Fingerprint, ScanEvent};
//! use std::path::PathBuf;
//!
//! let fp = Fingerprint::new(20000, [1u8; 32]);
//! let (tx, rx) = crossbeam_channel::bounded(8);
//! tx.send(ScanEvent::File(FileRecord::new(PathBuf::from("/a/x.bin"), fp))).unwrap();
//! tx.send(ScanEvent::File(FileRecord::new(PathBuf::from("/b/x.bin"), fp))).unwrap();
//! drop(tx);
//!
//! let aggregate = Aggregator::new().drain(rx).finish();
//! assert_eq!(aggregate.groups.len(), 1);
//! assert_eq!(aggregate.groups[0].reclaimable_bytes(), 20000);
//! ```

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crossbeam_channel::Receiver;
use serde::Serialize;

use crate::scanner::{FileRecord, Fingerprint, ScanError, ScanEvent};

/// All files sharing one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Size and digest shared by every member
    pub fingerprint: Fingerprint,
    /// File size in bytes (shared by all members)
    pub size: u64,
    /// Member paths in discovery order
    pub members: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a group from its fingerprint and members.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, members: Vec<PathBuf>) -> Self {
        Self {
            size: fingerprint.size,
            fingerprint,
            members,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether replacement applies (two or more members).
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.members.len() > 1
    }

    /// Bytes reclaimed if every member but one becomes a link.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * (self.members.len().saturating_sub(1) as u64)
    }

    /// Number of members that would be replaced.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Index of the member to keep.
    ///
    /// The first member that existing symlinks already point at wins, so
    /// repeated runs keep converging on the same file. Otherwise the first
    /// member in discovery order is kept.
    #[must_use]
    pub fn canonical_index(&self, link_targets: &HashSet<PathBuf>) -> usize {
        self.members
            .iter()
            .position(|m| link_targets.contains(m))
            .unwrap_or(0)
    }

    /// Member paths joined with commas, as printed in the report.
    #[must_use]
    pub fn joined_paths(&self) -> String {
        self.members
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Single-writer collector of scan events.
#[derive(Debug, Default)]
pub struct Aggregator {
    by_fingerprint: HashMap<Fingerprint, Vec<FileRecord>>,
    /// First-seen order of fingerprints, for stable group order on ties.
    order: Vec<Fingerprint>,
    seen_paths: HashSet<PathBuf>,
    link_targets: HashSet<PathBuf>,
    errors: Vec<ScanError>,
    files: usize,
    total_bytes: u64,
}

/// Everything the aggregator collected once the channel closed.
#[derive(Debug, Default)]
pub struct Aggregate {
    /// Groups with two or more members, largest savings first
    pub groups: Vec<DuplicateGroup>,
    /// Resolved targets of symlinks found during the walk
    pub link_targets: HashSet<PathBuf>,
    /// Per-directory and per-file failures
    pub errors: Vec<ScanError>,
    /// Number of distinct files recorded
    pub files: usize,
    /// Total size of recorded files
    pub total_bytes: u64,
}

impl Aggregator {
    /// Create an empty aggregator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one event.
    pub fn push(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::File(record) => self.push_record(record),
            ScanEvent::Link { link, target } => {
                log::trace!("{} -> {}", link.display(), target.display());
                self.link_targets.insert(target);
            }
            ScanEvent::Error(err) => self.errors.push(err),
        }
    }

    fn push_record(&mut self, record: FileRecord) {
        // A path reachable twice must never end up grouped with itself.
        if !self.seen_paths.insert(record.path.clone()) {
            log::debug!("Ignoring repeated path {}", record.path.display());
            return;
        }

        self.files += 1;
        self.total_bytes += record.size;

        match self.by_fingerprint.entry(record.fingerprint) {
            Entry::Occupied(mut e) => e.get_mut().push(record),
            Entry::Vacant(e) => {
                self.order.push(record.fingerprint);
                e.insert(vec![record]);
            }
        }
    }

    /// Consume events until every sender has been dropped.
    #[must_use]
    pub fn drain(mut self, rx: Receiver<ScanEvent>) -> Self {
        for event in rx {
            self.push(event);
        }
        self
    }

    /// Build the final groups.
    #[must_use]
    pub fn finish(mut self) -> Aggregate {
        let mut groups: Vec<DuplicateGroup> = self
            .order
            .iter()
            .filter_map(|fp| self.by_fingerprint.remove(fp))
            .filter(|records| records.len() > 1)
            .map(|records| {
                let fingerprint = records[0].fingerprint;
                let members = records.into_iter().map(|r| r.path).collect();
                DuplicateGroup::new(fingerprint, members)
            })
            .collect();

        // Stable sort keeps discovery order among equal savings.
        groups.sort_by(|a, b| b.reclaimable_bytes().cmp(&a.reclaimable_bytes()));

        Aggregate {
            groups,
            link_targets: self.link_targets,
            errors: self.errors,
            files: self.files,
            total_bytes: self.total_bytes,
        }
    }
}

/// Whether `path` lies under `root` (or is `root`).
#[must_use]
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
