//! Command-line interface definitions for linkdupe.
//!
//! Every option can also come from a `LINKDUPE_*` environment variable where
//! noted; flags on the command line win.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates under two trees without touching anything
//! linkdupe --dir /srv/a,/srv/b --dry-run
//!
//! # Link duplicates larger than 1 MiB, re-hashing each before replacing it
//! linkdupe -d ~/media --min-size 1MiB --verify
//!
//! # Machine-readable output
//! linkdupe -d . --output json
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::scanner::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_MIN_SIZE};

/// Replace duplicate files with symbolic links.
///
/// linkdupe walks one or more directory trees, fingerprints every regular
/// file above a size threshold with BLAKE3, and replaces all but one member of
/// each group of identical files with a symlink to the one it keeps.
#[derive(Debug, Parser)]
#[command(name = "linkdupe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directories to scan, comma separated
    #[arg(
        short,
        long,
        value_name = "PATHS",
        value_delimiter = ',',
        default_value = ".",
        env = "LINKDUPE_DIR"
    )]
    pub dir: Vec<PathBuf>,

    /// Report duplicates without replacing anything
    #[arg(long, alias = "dry_run")]
    pub dry_run: bool,

    /// Ignore files at or below this size (e.g., 16384, 64KiB, 1MB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(
        long,
        alias = "min_size",
        value_name = "SIZE",
        value_parser = parse_size,
        default_value_t = DEFAULT_MIN_SIZE,
        env = "LINKDUPE_MIN_SIZE"
    )]
    pub min_size: u64,

    /// Number of walker threads (default: available parallelism)
    #[arg(long, value_name = "N", env = "LINKDUPE_THREADS")]
    pub threads: Option<usize>,

    /// Capacity of the channel between walkers and the aggregator
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Re-hash each duplicate and the kept file right before replacing
    #[arg(long)]
    pub verify: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `Symlink ..., save bytes N` lines on stdout, summary on stderr
    #[default]
    Text,
    /// A single JSON document on stdout
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse a byte size with an optional decimal or binary suffix.
///
/// # Errors
///
/// Returns a message suitable for clap if the number or suffix is invalid.
///
/// # Example
///
/// ```
/// use linkdupe::cli::parse_size;
///
/// assert_eq!(parse_size("16384").unwrap(), 16384);
/// assert_eq!(parse_size("16KiB").unwrap(), 16384);
/// assert_eq!(parse_size("1.5 MB").unwrap(), 1_500_000);
/// ```
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    if number.is_empty() {
        return Err(format!("Invalid size: '{s}'"));
    }
    let multiplier: u64 = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "K" | "KB" => 1_000,
        "KIB" => 1 << 10,
        "M" | "MB" => 1_000_000,
        "MIB" => 1 << 20,
        "G" | "GB" => 1_000_000_000,
        "GIB" => 1 << 30,
        "T" | "TB" => 1_000_000_000_000,
        "TIB" => 1 << 40,
        other => return Err(format!("Unknown size suffix: '{other}'")),
    };

    // Whole numbers stay in integer arithmetic to keep every byte exact.
    if !number.contains('.') {
        let value: u64 = number
            .parse()
            .map_err(|_| format!("Invalid number: '{number}'"))?;
        return value
            .checked_mul(multiplier)
            .ok_or_else(|| format!("Size too large: '{s}'"));
    }

    let value: f64 = number
        .parse()
        .map_err(|_| format!("Invalid number: '{number}'"))?;
    Ok((value * multiplier as f64) as u64)
}
