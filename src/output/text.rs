//! Plain-text report.
//!
//! Each duplicate group produces one line on stdout:
//!
//! ```text
//! Symlink /data/a/x.bin,/data/b/x.bin, save bytes 20000
//! ```
//!
//! The run summary (bytes saved, files skipped and why) goes to stderr so the
//! report lines stay easy to pipe.

use std::io::{self, Write};

use crate::actions::LinkReport;
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Format the report line for one group.
///
/// # Example
///
/// ```
/// use linkdupe::duplicates::DuplicateGroup;
/// use linkdupe::output::text::report_line;
/// use linkdupe::scanner::Fingerprint;
///
/// let group = DuplicateGroup::new(
///     Fingerprint::new(20000, [0; 32]),
///     vec!["/a/x.bin".into(), "/b/x.bin".into()],
/// );
/// assert_eq!(report_line(&group), "Symlink /a/x.bin,/b/x.bin, save bytes 20000");
/// ```
#[must_use]
pub fn report_line(group: &DuplicateGroup) -> String {
    format!(
        "Symlink {}, save bytes {}",
        group.joined_paths(),
        group.reclaimable_bytes()
    )
}

/// Write one report line per group with two or more members.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_report<W: Write>(writer: &mut W, groups: &[DuplicateGroup]) -> io::Result<()> {
    for group in groups.iter().filter(|g| g.has_duplicates()) {
        writeln!(writer, "{}", report_line(group))?;
    }
    writer.flush()
}

/// End-of-run summary.
#[derive(Debug)]
pub struct TextSummary<'a> {
    summary: &'a ScanSummary,
    link_report: Option<&'a LinkReport>,
    dry_run: bool,
}

impl<'a> TextSummary<'a> {
    /// Create a summary for a scan and an optional replacement pass.
    #[must_use]
    pub fn new(summary: &'a ScanSummary, link_report: Option<&'a LinkReport>, dry_run: bool) -> Self {
        Self {
            summary,
            link_report,
            dry_run,
        }
    }

    /// Write the summary.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let s = self.summary;
        writeln!(
            writer,
            "Scanned {} file(s) in {} director{} ({} hashed) in {:.2?}",
            s.files_scanned,
            s.directories,
            if s.directories == 1 { "y" } else { "ies" },
            bytesize::ByteSize(s.bytes_hashed),
            s.scan_duration
        )?;
        writeln!(
            writer,
            "Found {} duplicate group(s), {} duplicate file(s), {} reclaimable",
            s.duplicate_groups,
            s.duplicate_files,
            s.reclaimable_display()
        )?;

        if self.dry_run {
            let planned = self.link_report.map_or(s.duplicate_files, |r| r.planned);
            writeln!(
                writer,
                "Dry run: {} file(s) would be linked, no files were changed",
                planned
            )?;
        } else if let Some(report) = self.link_report {
            writeln!(writer, "{}", report.summary())?;
        }
        if let Some(report) = self.link_report {
            if report.interrupted {
                writeln!(writer, "Linking was interrupted before all groups were processed")?;
            }
        }

        let link_failures = self.link_report.map_or(0, LinkReport::failure_count);
        let skipped = s.scan_errors.len() + link_failures;
        if skipped > 0 {
            writeln!(writer, "Skipped {} item(s) due to errors:", skipped)?;
            for err in &s.scan_errors {
                writeln!(writer, "  - {}", err)?;
            }
            if let Some(report) = self.link_report {
                for failure in &report.failures {
                    writeln!(writer, "  - {}", failure.error)?;
                }
            }
        }

        writer.flush()
    }
}
