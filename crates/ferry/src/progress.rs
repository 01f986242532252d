// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal progress display for CLI jobs.

use std::time::Duration;

use async_trait::async_trait;
use ferry_engine::{Progress, ProgressSink};
use indicatif::{ProgressBar, ProgressStyle};

/// Spinner that shows the latest progress update.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_message(label.to_string());
        Self { bar }
    }

    /// Handle for hiding the spinner while the terminal is used for input.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl ProgressSink for SpinnerProgress {
    async fn report(&self, progress: Progress) {
        self.bar.set_message(describe(&progress));
    }
}

fn describe(progress: &Progress) -> String {
    match progress {
        Progress::Indexed {
            processed,
            saved,
            skipped,
            last_sequence,
        } => format!(
            "Indexed: {processed} | Saved: {saved} | Skipped: {skipped} | At: {last_sequence}"
        ),
        Progress::Delivered {
            delivered,
            shard_index,
            shard_pending,
        } => format!("Delivered: {delivered} | Shard: {shard_index} | Left in shard: {shard_pending}"),
        Progress::CoolingDown {
            tier,
            duration,
            delivered,
        } => format!(
            "Cooling down ({tier}) for {}s | Delivered: {delivered}",
            duration.as_secs()
        ),
        Progress::Throttled { wait } => format!("Throttled, waiting {}s", wait.as_secs()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describes_each_update() {
        assert_eq!(
            describe(&Progress::Delivered {
                delivered: 10,
                shard_index: 1,
                shard_pending: 5
            }),
            "Delivered: 10 | Shard: 1 | Left in shard: 5"
        );
        assert_eq!(
            describe(&Progress::Throttled {
                wait: Duration::from_secs(42)
            }),
            "Throttled, waiting 42s"
        );
    }
}
