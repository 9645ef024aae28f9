//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to draw a spinner while the trees are walked and a
//! bar while duplicate groups are linked. Bars are drawn on stderr so the
//! report on stdout stays clean.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

/// Phase name used while walking and fingerprinting.
pub const PHASE_WALKING: &str = "walking";
/// Phase name used while replacing duplicates with symlinks.
pub const PHASE_LINKING: &str = "linking";

/// Progress callback for the scan and link phases.
///
/// Implement this trait to receive progress updates during the pipeline.
/// Walker threads call it concurrently.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts. `total` is zero when unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter using indicatif.
pub struct Progress {
    walking: Mutex<Option<ProgressBar>>,
    linking: Mutex<Option<ProgressBar>>,
    bytes: Mutex<u64>,
    quiet: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use linkdupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            walking: Mutex::new(None),
            linking: Mutex::new(None),
            bytes: Mutex::new(0),
            quiet,
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} files ({prefix}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn linking_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} groups {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        match phase {
            PHASE_WALKING => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(Self::walking_style());
                pb.enable_steady_tick(Duration::from_millis(100));
                *lock(&self.bytes) = 0;
                *lock(&self.walking) = Some(pb);
            }
            PHASE_LINKING => {
                let pb = ProgressBar::new(total as u64);
                pb.set_style(Self::linking_style());
                *lock(&self.linking) = Some(pb);
            }
            other => log::debug!("Ignoring unknown progress phase '{}'", other),
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *lock(&self.linking) {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        } else if let Some(ref pb) = *lock(&self.walking) {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        if self.quiet {
            return;
        }

        let mut total = lock(&self.bytes);
        *total += bytes;
        if let Some(ref pb) = *lock(&self.walking) {
            pb.set_prefix(HumanBytes(*total).to_string());
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        let slot = match phase {
            PHASE_WALKING => &self.walking,
            PHASE_LINKING => &self.linking,
            _ => return,
        };
        if let Some(pb) = lock(slot).take() {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(count.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
