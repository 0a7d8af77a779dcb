//! Live progress display for a batch run.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use clipset_models::{Outcome, OutcomeKind};

const PROGRESS_TEMPLATE: &str =
    "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} (eta {eta}) {msg}";

/// How many characters of an item id to show.
const ID_DISPLAY_CHARS: usize = 20;

/// Progress bar advanced once per arriving outcome.
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Create a bar for `total` items. A hidden bar is used when `visible`
    /// is false, so callers never need to branch.
    pub fn new(total: usize, label: &str, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };

        match ProgressStyle::with_template(PROGRESS_TEMPLATE) {
            Ok(style) => bar.set_style(style),
            Err(e) => debug!("Invalid progress template: {}", e),
        }
        bar.set_length(total as u64);
        bar.set_prefix(label.to_string());

        Self { bar }
    }

    pub fn record(&self, outcome: &Outcome) {
        self.bar.set_message(progress_message(outcome));
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

/// `ok:`, `skip:` or `fail:` followed by the start of the item id.
pub fn progress_message(outcome: &Outcome) -> String {
    let tag = match outcome.kind() {
        OutcomeKind::Success => "ok",
        OutcomeKind::Skipped => "skip",
        OutcomeKind::Failure => "fail",
    };
    let id: String = outcome.id().chars().take(ID_DISPLAY_CHARS).collect();
    format!("{}: {}", tag, id)
}
