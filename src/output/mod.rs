//! Output formatters for scan and link results.
//!
//! This module provides two output formats:
//! - Text: one `Symlink ..., save bytes N` line per group, summary on stderr
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```no_run
//! use linkdupe::duplicates::DuplicateFinder;
//! use linkdupe::error::ExitCode;
//! use linkdupe::output::{json::JsonOutput, text};
//! use std::path::PathBuf;
//!
//! let result = DuplicateFinder::with_defaults()
//!     .find_duplicates(&[PathBuf::from(".")])
//!     .unwrap();
//!
//! text::write_report(&mut std::io::stdout(), &result.groups).unwrap();
//!
//! let output = JsonOutput::new(&result.groups, &result.summary, None, true, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
pub use text::{report_line, write_report, TextSummary};
