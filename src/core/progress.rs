//! Progress reporting for long labeling passes, using indicatif.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};

/// Style templates for the bars shown by the CLI.
pub mod styles {
    use super::*;

    /// Bar style for per-ticket passes (linking, labeling).
    pub fn ticket_progress() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:30.cyan/blue}] {pos}/{len} tickets {msg}")
            .expect("valid template")
            .progress_chars("#>-")
    }

    /// Spinner style for history loading and cold-start sampling.
    pub fn spinner() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template")
    }
}

/// Ticket counter backed by a progress bar.
///
/// Cloning shares the same bar and counter, so it can be moved into the
/// progress callback of a labeling pass.
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
    counter: Arc<AtomicUsize>,
}

impl ProgressTracker {
    /// Create a visible tracker for `total` tickets.
    pub fn new(total: usize, phase: &str) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(styles::ticket_progress());
        bar.set_prefix(phase.to_string());

        Self {
            bar,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a hidden tracker (non-TTY output).
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::hidden();
        bar.set_length(total as u64);

        Self {
            bar,
            counter: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a tracker that is only drawn when stderr is a terminal.
    pub fn for_terminal(total: usize, phase: &str) -> Self {
        if is_tty() {
            Self::new(total, phase)
        } else {
            Self::hidden(total)
        }
    }

    /// Move the tracker to an absolute position.
    pub fn set_position(&self, current: usize) {
        self.counter.store(current, Ordering::Relaxed);
        self.bar.set_position(current as u64);
    }

    /// Set the trailing message (usually the current ticket id).
    pub fn set_message(&self, msg: impl Into<String>) {
        self.bar.set_message(msg.into());
    }

    /// Finish and clear the bar.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }

    /// Current position.
    pub fn count(&self) -> usize {
        self.counter.load(Ordering::Relaxed)
    }
}

/// Check if stderr is a TTY (for deciding whether to show progress bars).
pub fn is_tty() -> bool {
    use std::io::IsTerminal;
    std::io::stderr().is_terminal()
}

/// Create a spinner for indeterminate operations.
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_tty() {
        let bar = ProgressBar::new_spinner();
        bar.set_style(styles::spinner());
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(100));
        bar
    } else {
        ProgressBar::hidden()
    }
}
