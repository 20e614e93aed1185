//! Progress reporting for the index-building stage.
//!
//! Stages report through the [`ProgressCallback`] trait; [`Progress`] is the
//! indicatif implementation used by the CLI. Bars are drawn on stderr and are
//! hidden entirely when quiet.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receiver for stage progress events.
pub trait ProgressCallback: Send + Sync {
    /// A phase is starting. `total` is 0 when the item count is unknown.
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Item `current` (1-based) of the active phase is being processed.
    ///
    /// With parallel workers calls may arrive out of order.
    fn on_progress(&self, current: usize, path: &str);

    /// An item of `bytes` bytes finished.
    fn on_item_completed(&self, _bytes: u64) {}

    /// The phase finished.
    fn on_phase_end(&self, phase: &str);
}

/// Terminal progress reporter.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    bytes: AtomicU64,
    quiet: bool,
}

impl Progress {
    /// Create a reporter; `quiet` suppresses all drawing.
    ///
    /// ```
    /// use stagedupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert!(progress.is_quiet());
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            bytes: AtomicU64::new(0),
            quiet,
        }
    }

    /// Whether drawing is suppressed.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Bytes reported as completed in the current phase.
    #[must_use]
    pub fn bytes_processed(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.bytes.store(0, Ordering::Relaxed);
        if self.quiet {
            return;
        }

        let bar = if total == 0 {
            let bar = ProgressBar::new_spinner();
            bar.set_style(Self::spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            let bar = ProgressBar::new(total as u64);
            bar.set_style(Self::bar_style());
            bar
        };
        bar.set_draw_target(ProgressDrawTarget::stderr());
        bar.set_message(phase_label(phase));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(previous) = guard.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        self.with_bar(|bar| {
            // Never move backwards
            if current as u64 > bar.position() {
                bar.set_position(current as u64);
            }
            bar.set_message(truncate_path(path, 40));
        });
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(bar) = guard.take() {
                let bytes = self.bytes_processed();
                let message = if bytes > 0 {
                    format!("{} complete ({})", phase_label(phase), HumanBytes(bytes))
                } else {
                    format!("{} complete", phase_label(phase))
                };
                bar.finish_with_message(message);
            }
        }
    }

}

fn phase_label(phase: &str) -> String {
    match phase {
        "walking" => "Walking".to_string(),
        "hashing" => "Hashing".to_string(),
        other => other.to_string(),
    }
}

/// Shorten `path` to at most `max_len` characters, keeping the file name.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name
            .chars()
            .skip(name_len.saturating_sub(max_len.saturating_sub(3)))
            .collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
