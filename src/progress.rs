//! Download progress reporting
//!
//! Renders a fixed-width bar followed by the completed percentage, e.g.
//! `######              | 30.00%`, on standard error while a fetch is running.
//! The bar is drawn even when stderr is redirected to a file or pipe.

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Width of the rendered bar in characters; with the percentage it fits an
/// 80-column line
const BAR_WIDTH: usize = 60;

/// Returns the completed fraction of a download in `0.0..=1.0`
///
/// An unknown or zero total reports `0.0` rather than dividing by zero.
pub fn fraction(downloaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (downloaded as f64 / total as f64).min(1.0)
}

/// Formats a fraction as a percentage with two decimals (`"42.00%"`)
pub fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

/// Progress indicator for a single download
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    bar: ProgressBar,
}

impl DownloadProgress {
    /// Creates a progress indicator drawn to standard error
    pub fn stderr() -> Self {
        // A plain stderr target stays silent unless stderr is a terminal
        Self::with_target(ProgressDrawTarget::term_like(Box::new(Term::stderr())))
    }

    /// Creates a progress indicator that tracks state without drawing anything
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let template = format!("{{bar:{}}} | {{msg}}", BAR_WIDTH);
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("# ");

        let bar = ProgressBar::with_draw_target(Some(0), target);
        bar.set_style(style);
        bar.set_message(format_percent(0.0));
        Self { bar }
    }

    /// Records that `downloaded` of `total` bytes have arrived
    ///
    /// `total` is 0 when the server did not announce a content length.
    pub fn update(&self, downloaded: u64, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(downloaded);
        self.bar.set_message(format_percent(fraction(downloaded, total)));
    }

    /// Leaves the final state on screen and moves to a fresh line
    pub fn finish(&self) {
        self.bar.finish();
    }

    /// Bytes reported so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Current percentage message, as displayed after the bar
    pub fn message(&self) -> String {
        self.bar.message()
    }
}
