//! File actions module.
//!
//! The [`link`] module turns duplicate groups into symlinks:
//! - One canonical member is kept per group
//! - Every other member is replaced through a temporary link and an atomic
//!   rename, so a failure never loses the original
//! - Permission bits are carried over and failures are reported per file
//!
//! ```no_run
//! use linkdupe::actions::{link_groups, LinkConfig};
//! use std::collections::HashSet;
//!
//! let report = link_groups(&[], &HashSet::new(), &LinkConfig::default().with_dry_run(true));
//! assert!(report.all_succeeded());
//! ```

pub mod link;

pub use link::{
    link_group, link_groups, replace_with_symlink, LinkConfig, LinkError, LinkFailure,
    LinkOutcome, LinkReport,
};
