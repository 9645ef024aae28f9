//! Process exit codes and structured fatal errors.

use serde::Serialize;

use crate::duplicates::FinderError;

/// Exit codes for the linkdupe binary.
///
/// - 0: duplicates found and handled (or reported on a dry run)
/// - 1: general error
/// - 2: no duplicates found
/// - 3: partial success, some files or directories were skipped
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Duplicates were found and every one was handled.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// The scan completed without finding duplicates.
    NoDuplicates = 2,
    /// The run completed but skipped some items because of errors.
    PartialSuccess = 3,
    /// The run was interrupted by the user.
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "LD000",
            Self::GeneralError => "LD001",
            Self::NoDuplicates => "LD002",
            Self::PartialSuccess => "LD003",
            Self::Interrupted => "LD130",
        }
    }

    /// Exit code for an error that aborted the run.
    #[must_use]
    pub fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<FinderError>() {
            Some(FinderError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}

/// Fatal error rendered as JSON with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "LD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
