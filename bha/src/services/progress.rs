//! Progress reporting for multi-file trace parsing.
//!
//! Thin wrapper over `indicatif`; bars are hidden entirely when progress is
//! disabled (quiet mode, JSON output, or a non-TTY stderr).

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

#[derive(Clone)]
pub struct ProgressTracker {
    enable_progress: bool,
}

impl ProgressTracker {
    pub fn new(enable_progress: bool) -> Self {
        Self { enable_progress }
    }

    /// A spinner for an indeterminate operation.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        if !self.enable_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("static template"),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// A counting bar for file processing.
    pub fn file_bar(&self, total_files: u64, message: &str) -> ProgressBar {
        if !self.enable_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total_files);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%)")
                .expect("static template")
                .progress_chars("=> "),
        );
        pb.set_message(message.to_string());
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracker_yields_hidden_bars() {
        let tracker = ProgressTracker::new(false);
        let bar = tracker.file_bar(10, "parsing");
        assert!(bar.is_hidden());
        let spinner = tracker.spinner("working");
        assert!(spinner.is_hidden());
    }
}
