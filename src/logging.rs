//! Logging setup on top of the `log` facade and `env_logger`.
//!
//! The level comes from, in order:
//!
//! 1. `RUST_LOG`, when set
//! 2. `--quiet` (errors only) or `-v` / `-vv` (debug / trace)
//! 3. info otherwise
//!
//! Debug builds prefix each line with a timestamp, and with the module path
//! once verbose output is requested. Release builds print `LEVEL message`.
//!
//! ```rust,no_run
//! use linkdupe::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("walker pool ready");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Install the global logger.
///
/// Later calls in the same process keep the first logger and only log a
/// debug message, so tests can call this freely.
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = env::var("RUST_LOG").ok();

    let mut builder = Builder::new();
    let level = level_for(verbose, quiet);
    match from_env {
        Some(_) => {
            builder.parse_default_env();
        }
        None => {
            builder.filter_level(level);
        }
    }
    apply_format(&mut builder, verbose);

    if builder.try_init().is_err() {
        log::debug!("Logger already installed, keeping the existing one");
        return;
    }

    match from_env {
        Some(spec) => log::debug!("Log filter taken from RUST_LOG={}", spec),
        None => log::debug!("Log level set to {}", level),
    }
}

/// Map CLI flags to a level filter. `quiet` wins over `verbose`.
fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn apply_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let style = buf.default_level_style(record.level());
        let ts = buf.timestamp_seconds();
        if verbose > 0 {
            writeln!(
                buf,
                "{ts} {style}{:<5}{style:#} [{}] {}",
                record.level(),
                record.module_path().unwrap_or("?"),
                record.args()
            )
        } else {
            writeln!(buf, "{ts} {style}{:<5}{style:#} {}", record.level(), record.args())
        }
    });
}

#[cfg(not(debug_assertions))]
fn apply_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let style = buf.default_level_style(record.level());
        writeln!(buf, "{style}{:<5}{style:#} {}", record.level(), record.args())
    });
}

/// Name of the currently active maximum level.
#[must_use]
pub fn current_level_name() -> &'static str {
    match log::max_level() {
        LevelFilter::Off => "off",
        LevelFilter::Error => "error",
        LevelFilter::Warn => "warn",
        LevelFilter::Info => "info",
        LevelFilter::Debug => "debug",
        LevelFilter::Trace => "trace",
    }
}
