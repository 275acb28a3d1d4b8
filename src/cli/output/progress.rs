//! Progress bar utilities using indicatif for terminal output
//!
//! Bars and spinners draw to stderr. Under `--json` they are hidden so
//! stdout carries only the JSON document.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg} (ETA: {eta})";
const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";

const PROGRESS_CHARS: &str = "█▓▒░ ";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a progress bar with ETA for `total` items.
///
/// The bar is hidden, but still counts, when `visible` is false.
pub fn create_progress_bar(total: u64, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden());
    }

    let style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars(PROGRESS_CHARS);

    let pb = ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::stderr());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a spinner for operations without a known total.
pub fn create_spinner(message: impl Into<String>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);

    let spinner = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    spinner.set_style(style);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

/// Extension trait for ProgressBar with convenience methods
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);

    /// Update progress and message in one call
    ///
    /// Not named `update`: indicatif's inherent `ProgressBar::update` would
    /// shadow it at method-call syntax.
    fn set_progress(&self, position: u64, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.abandon_with_message(format!("✗ {}", message.into()));
    }

    fn set_progress(&self, position: u64, message: impl Into<String>) {
        self.set_position(position);
        self.set_message(message.into());
    }
}
