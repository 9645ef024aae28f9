//! Ctrl+C handling.
//!
//! A single `Arc<AtomicBool>` is shared by the walker pool, the hasher and
//! the link pass. The `ctrlc` handler only sets it; every component checks
//! it between units of work and winds down on its own, so an interrupted
//! run never leaves a half-replaced file behind.
//!
//! ```rust,no_run
//! use linkdupe::duplicates::FinderConfig;
//! use linkdupe::signal::install_handler;
//!
//! let handler = install_handler().unwrap();
//! let config = FinderConfig::default().with_shutdown_flag(handler.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for an interrupted run (128 + SIGINT).
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Set the flag.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// The flag itself, for handing to worker configuration.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The platform refused the handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static INSTALLED: OnceLock<ShutdownHandler> = OnceLock::new();

/// Register the Ctrl+C handler, once per process.
///
/// Repeated calls return the already installed handler with its flag
/// cleared. If some other code already owns the process handler, an
/// unhooked handler is returned that still honors
/// [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the handler cannot be
/// registered for any other reason.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(existing) = INSTALLED.get() {
        existing.reset();
        return Ok(existing.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.flag();
    let registered = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
        let _ = stderr.flush();
    });

    match registered {
        Ok(()) => {
            log::debug!("Ctrl+C handler installed");
            Ok(INSTALLED.get_or_init(|| handler).clone())
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C handler already registered, using an unhooked flag");
            Ok(INSTALLED.get_or_init(ShutdownHandler::new).clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
