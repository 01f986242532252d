// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live job status in the operator's chat.
//!
//! [`StatusMessage`] posts one message when a job starts reporting and edits
//! it in place afterwards, throttled so long runs do not hit edit limits.

use std::time::Duration;

use async_trait::async_trait;
use ferry_core::DestinationShard;
use ferry_engine::{DeliverySummary, IndexReport, Progress, ProgressSink};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::warn;

/// Minimum interval between edits of the status message.
const EDIT_THROTTLE: Duration = Duration::from_millis(1500);

struct Posted {
    message_id: MessageId,
    last_edit: Instant,
}

/// Edit-in-place [`ProgressSink`] for one chat.
pub struct StatusMessage {
    bot: Bot,
    chat_id: ChatId,
    posted: Mutex<Option<Posted>>,
}

impl StatusMessage {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self {
            bot,
            chat_id,
            posted: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ProgressSink for StatusMessage {
    async fn report(&self, progress: Progress) {
        let text = format_progress(&progress);
        let mut posted = self.posted.lock().await;
        match posted.as_mut() {
            None => match self.bot.send_message(self.chat_id, text).await {
                Ok(msg) => {
                    *posted = Some(Posted {
                        message_id: msg.id,
                        last_edit: Instant::now(),
                    })
                }
                Err(e) => warn!(error = %e, "failed to post status message"),
            },
            Some(state) => {
                // Cooldowns are rare and worth showing immediately.
                let urgent = matches!(progress, Progress::CoolingDown { .. });
                if !urgent && state.last_edit.elapsed() < EDIT_THROTTLE {
                    return;
                }
                match self
                    .bot
                    .edit_message_text(self.chat_id, state.message_id, text)
                    .await
                {
                    Ok(_) => state.last_edit = Instant::now(),
                    Err(e) if e.to_string().contains("message is not modified") => {}
                    Err(e) => warn!(error = %e, "failed to edit status message"),
                }
            }
        }
    }
}

pub fn format_progress(progress: &Progress) -> String {
    match progress {
        Progress::Indexed {
            processed,
            saved,
            skipped,
            last_sequence,
        } => format!(
            "Indexing: {processed} processed, {saved} saved, {skipped} skipped (at message {last_sequence})"
        ),
        Progress::Delivered {
            delivered,
            shard_index,
            shard_pending,
        } => format!(
            "Cloning: {delivered} delivered, shard {shard_index} has {shard_pending} left"
        ),
        Progress::CoolingDown {
            tier,
            duration,
            delivered,
        } => format!(
            "Cooling down ({tier}) for {} after {delivered} deliveries",
            format_duration(*duration)
        ),
        Progress::Throttled { wait } => {
            format!("Throttled, waiting {}", format_duration(*wait))
        }
    }
}

pub fn format_index_report(report: &IndexReport) -> String {
    let head = if report.cancelled {
        "Indexing cancelled"
    } else {
        "Indexing finished"
    };
    format!(
        "{head}: {} processed, {} saved, {} skipped. Last message: {}",
        report.processed, report.saved, report.skipped, report.last_sequence
    )
}

pub fn format_summary(summary: &DeliverySummary) -> String {
    let head = if summary.cancelled {
        "Clone stopped"
    } else {
        "Clone finished"
    };
    let mut text = format!(
        "{head}: {} delivered, {} deferred",
        summary.delivered, summary.deferred
    );
    if !summary.shards.is_empty() {
        text.push('\n');
        text.push_str(&format_shards(&summary.shards));
    }
    text
}

pub fn format_shards(shards: &[DestinationShard]) -> String {
    if shards.is_empty() {
        return "No destinations planned.".to_string();
    }
    shards
        .iter()
        .map(|s| {
            format!(
                "{}. {} ({}): {} delivered, {} pending",
                s.shard_index, s.destination_id, s.state, s.delivered_count, s.pending_count
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Allocator counters in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    pub allocated: u64,
    pub resident: u64,
}

/// Process facts behind `/server`.
#[derive(Debug, Clone, Copy)]
pub struct HostInfo {
    pub started: std::time::Instant,
    /// Reads allocator counters; `None` when the allocator has none.
    pub memory: fn() -> Option<MemoryStats>,
}

impl HostInfo {
    pub fn report(&self) -> String {
        format_host(self.started.elapsed(), (self.memory)())
    }
}

pub fn format_host(uptime: Duration, memory: Option<MemoryStats>) -> String {
    let mut text = format!("Uptime: {}", format_duration(uptime));
    match memory {
        Some(m) => {
            text.push_str(&format!(
                "\nMemory: {} allocated, {} resident",
                format_bytes(m.allocated),
                format_bytes(m.resident)
            ));
        }
        None => text.push_str("\nMemory: unavailable"),
    }
    text
}

fn format_bytes(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else {
        format!("{} KiB", bytes / 1024)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}
