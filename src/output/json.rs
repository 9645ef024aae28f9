//! JSON output formatter for scan and link results.
//!
//! Provides machine-readable JSON output for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "generated_at": "2024-01-01T00:00:00Z",
//!   "duplicates": [
//!     {
//!       "fingerprint": "20000_af13...",
//!       "size": 20000,
//!       "save_bytes": 20000,
//!       "files": ["/data/a/x.bin", "/data/b/x.bin"]
//!     }
//!   ],
//!   "summary": { "files_scanned": 3, "duplicate_groups": 1, "...": "..." },
//!   "link": { "linked": 1, "bytes_reclaimed": 20000, "failures": [] },
//!   "errors": []
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::LinkReport;
use crate::duplicates::{DuplicateGroup, ScanSummary};
use crate::error::ExitCode;
use crate::scanner::Fingerprint;

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// `<size>_<digest>` key shared by every file
    pub fingerprint: Fingerprint,
    /// File size in bytes
    pub size: u64,
    /// Bytes reclaimed by linking all but one file
    pub save_bytes: u64,
    /// Absolute paths of all members
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            fingerprint: group.fingerprint,
            size: group.size,
            save_bytes: group.reclaimable_bytes(),
            files: group
                .members
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Roots that were walked
    pub roots: Vec<String>,
    /// Files fingerprinted
    pub files_scanned: usize,
    /// Bytes read while fingerprinting
    pub bytes_hashed: u64,
    /// Directories listed
    pub directories: usize,
    /// Symbolic links skipped
    pub symlinks_skipped: usize,
    /// Files at or below the size threshold
    pub small_files_skipped: usize,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Members that would be replaced
    pub duplicate_files: usize,
    /// Bytes reclaimable by linking
    pub reclaimable_space: u64,
    /// Duration of the scan in milliseconds
    pub scan_duration_ms: u64,
    /// Whether no file was changed
    pub dry_run: bool,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "LD000")
    pub exit_code_name: String,
}

impl JsonSummary {
    fn new(summary: &ScanSummary, dry_run: bool, exit_code: ExitCode) -> Self {
        Self {
            roots: summary
                .roots
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
            files_scanned: summary.files_scanned,
            bytes_hashed: summary.bytes_hashed,
            directories: summary.directories,
            symlinks_skipped: summary.symlinks_skipped,
            small_files_skipped: summary.small_files_skipped,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
            dry_run,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// A failure attached to a path.
#[derive(Debug, Clone, Serialize)]
pub struct JsonError {
    /// Path the error refers to
    pub path: String,
    /// Human-readable message
    pub message: String,
}

/// Outcome of the replacement pass in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonLinkReport {
    /// Duplicates replaced by symlinks
    pub linked: usize,
    /// Duplicates that already pointed at the canonical file
    pub already_linked: usize,
    /// Duplicates that would be replaced (dry run)
    pub planned: usize,
    /// Bytes reclaimed
    pub bytes_reclaimed: u64,
    /// Whether linking stopped early
    pub interrupted: bool,
    /// Duplicates left untouched
    pub failures: Vec<JsonError>,
}

impl From<&LinkReport> for JsonLinkReport {
    fn from(report: &LinkReport) -> Self {
        Self {
            linked: report.linked,
            already_linked: report.already_linked,
            planned: report.planned,
            bytes_reclaimed: report.bytes_reclaimed,
            interrupted: report.interrupted,
            failures: report
                .failures
                .iter()
                .map(|f| JsonError {
                    path: f.path.to_string_lossy().into_owned(),
                    message: f.error.to_string(),
                })
                .collect(),
        }
    }
}

/// Complete JSON document for one run.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// When the document was produced
    pub generated_at: DateTime<Utc>,
    /// Groups with two or more members
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Scan statistics
    pub summary: JsonSummary,
    /// Replacement outcome; absent when no link pass ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<JsonLinkReport>,
    /// Non-fatal scan errors
    pub errors: Vec<JsonError>,
}

impl JsonOutput {
    /// Build the document.
    #[must_use]
    pub fn new(
        groups: &[DuplicateGroup],
        summary: &ScanSummary,
        link_report: Option<&LinkReport>,
        dry_run: bool,
        exit_code: ExitCode,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            duplicates: groups
                .iter()
                .filter(|g| g.has_duplicates())
                .map(JsonDuplicateGroup::from)
                .collect(),
            summary: JsonSummary::new(summary, dry_run, exit_code),
            link: link_report.map(JsonLinkReport::from),
            errors: summary
                .scan_errors
                .iter()
                .map(|e| JsonError {
                    path: e.path().to_string_lossy().into_owned(),
                    message: e.to_string(),
                })
                .collect(),
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        let json = self.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
