//! linkdupe - replace duplicate files with symbolic links
//!
//! Walks one or more directory trees with a bounded pool of worker threads,
//! fingerprints every regular file above a size threshold (exact size plus a
//! BLAKE3 digest of the whole content), groups identical files, and replaces
//! all but one member of each group with a symlink to the member it keeps.
//!
//! The library is split into:
//! - [`scanner`]: parallel traversal and fingerprinting
//! - [`duplicates`]: root handling, aggregation and grouping
//! - [`actions`]: the symlink replacement pass
//! - [`output`]: text and JSON reports

pub mod actions;
pub mod cli;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Context;

use crate::actions::{link_groups, LinkConfig, LinkReport};
use crate::cli::{Cli, OutputFormat};
use crate::duplicates::{DuplicateFinder, FinderConfig, ScanResult};
use crate::error::ExitCode;
use crate::output::{text, JsonOutput, TextSummary};
use crate::progress::{Progress, ProgressCallback};
use crate::scanner::WalkerConfig;

/// Run a full scan and link pass for parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if the scan cannot run at all (no usable root, worker
/// failure, interruption during the scan) or the report cannot be written.
/// Per-file problems are reported in the output and reflected in the exit
/// code instead.
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let shutdown = signal::install_handler().context("Failed to set up Ctrl+C handling")?;

    let progress: Option<Arc<dyn ProgressCallback>> = if cli.quiet || cli.no_progress {
        None
    } else {
        Some(Arc::new(Progress::new(false)))
    };

    let mut walker_config = WalkerConfig::default()
        .with_min_size(cli.min_size)
        .with_channel_capacity(cli.channel_capacity);
    if let Some(threads) = cli.threads {
        walker_config = walker_config.with_threads(threads);
    }
    log::debug!("Walker configuration: {:?}", walker_config);

    let mut finder_config = FinderConfig {
        walker_config,
        ..FinderConfig::default()
    }
    .with_shutdown_flag(shutdown.flag());
    if let Some(ref callback) = progress {
        finder_config = finder_config.with_progress_callback(Arc::clone(callback));
    }

    let result = DuplicateFinder::new(finder_config)
        .find_duplicates(&cli.dir)
        .context("Duplicate scan failed")?;

    if cli.output == OutputFormat::Text {
        let stdout = io::stdout();
        text::write_report(&mut stdout.lock(), &result.groups)
            .context("Failed to write report")?;
    }

    let mut link_config = LinkConfig::default()
        .with_dry_run(cli.dry_run)
        .with_verify_content(cli.verify)
        .with_shutdown_flag(shutdown.flag());
    if let Some(ref callback) = progress {
        link_config = link_config.with_progress_callback(Arc::clone(callback));
    }
    let report = link_groups(&result.groups, &result.link_targets, &link_config);

    let exit_code = exit_code_for(&result, &report);

    match cli.output {
        OutputFormat::Text => {
            if !cli.quiet {
                let stderr = io::stderr();
                TextSummary::new(&result.summary, Some(&report), cli.dry_run)
                    .write_to(&mut stderr.lock())
                    .context("Failed to write summary")?;
            }
        }
        OutputFormat::Json => {
            let output = JsonOutput::new(
                &result.groups,
                &result.summary,
                Some(&report),
                cli.dry_run,
                exit_code,
            );
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            output
                .write_to(&mut handle)
                .context("Failed to write JSON output")?;
            handle.flush().context("Failed to flush JSON output")?;
        }
    }

    Ok(exit_code)
}

/// Exit code for a run that reached the end of the link pass.
#[must_use]
pub fn exit_code_for(result: &ScanResult, report: &LinkReport) -> ExitCode {
    if report.interrupted {
        ExitCode::Interrupted
    } else if result.summary.has_errors() || !report.failures.is_empty() {
        ExitCode::PartialSuccess
    } else if result.groups.is_empty() {
        ExitCode::NoDuplicates
    } else {
        ExitCode::Success
    }
}
