// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Progress reporting from long-running jobs to whichever front-end started
//! them.

use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

/// A periodic update from the indexer or the pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Indexed {
        processed: u64,
        saved: u64,
        skipped: u64,
        last_sequence: i64,
    },
    Delivered {
        delivered: u64,
        shard_index: u32,
        shard_pending: u64,
    },
    CoolingDown {
        tier: &'static str,
        duration: Duration,
        delivered: u64,
    },
    Throttled {
        wait: Duration,
    },
}

/// Receiver of progress updates. Implementations must not fail the job.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, progress: Progress);
}

/// Writes progress to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

#[async_trait]
impl ProgressSink for LogProgress {
    async fn report(&self, progress: Progress) {
        match progress {
            Progress::Indexed {
                processed,
                saved,
                skipped,
                last_sequence,
            } => info!(processed, saved, skipped, last_sequence, "indexing"),
            Progress::Delivered {
                delivered,
                shard_index,
                shard_pending,
            } => info!(delivered, shard_index, shard_pending, "cloning"),
            Progress::CoolingDown {
                tier,
                duration,
                delivered,
            } => info!(tier, secs = duration.as_secs(), delivered, "cooling down"),
            Progress::Throttled { wait } => info!(secs = wait.as_secs(), "throttled"),
        }
    }
}
