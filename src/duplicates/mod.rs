//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Root normalization and scan orchestration ([`finder`])
//! - Fingerprint grouping on a single aggregator thread ([`groups`])

pub mod finder;
pub mod groups;

pub use finder::{
    normalize_roots, DuplicateFinder, FinderConfig, FinderError, ScanResult, ScanSummary,
};
pub use groups::{Aggregate, Aggregator, DuplicateGroup};
