// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Indexer: scans a source range and records qualifying items in the catalog.
//!
//! The scan reads fixed-size windows of sequence numbers, classifies each
//! message, and writes batches through the insert-if-absent path, so
//! re-indexing the same range only reports skips. Holes left by deleted
//! messages are scanned past; the scan ends when the transport reports the
//! source exhausted or after `max_gap` empty ids in a row. Multi-part
//! groups are buffered until the scan ends; their captions are joined in
//! sequence order onto the first part.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ferry_config::model::IndexConfig;
use ferry_core::{
    CatalogItem, CategoryFilter, FerryError, ItemKind, SourceItem, StorageAdapter, Transport,
    TransportError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::{Progress, ProgressSink};

/// What to index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRequest {
    pub source: String,
    /// Sequence to start after; `0` scans from the beginning.
    pub offset: i64,
    /// Maximum qualifying items to process; `0` means no limit.
    pub limit: u64,
    pub filter: CategoryFilter,
    /// Replaces every item's caption when set.
    pub caption: Option<String>,
}

impl IndexRequest {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            offset: 0,
            limit: 0,
            filter: CategoryFilter::All,
            caption: None,
        }
    }
}

/// Counters for one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    /// Qualifying items seen.
    pub processed: u64,
    pub saved: u64,
    /// Duplicates, both within this run and already in the catalog.
    pub skipped: u64,
    /// Sequence of the last message examined.
    pub last_sequence: i64,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct IndexSettings {
    pub window_size: usize,
    pub batch_size: usize,
    pub progress_every: u64,
    /// Empty ids in a row that end the scan.
    pub max_gap: u64,
}

impl From<&IndexConfig> for IndexSettings {
    fn from(config: &IndexConfig) -> Self {
        Self {
            window_size: config.window_size.max(1),
            batch_size: config.batch_size.max(1),
            progress_every: config.progress_every.max(1),
            max_gap: config.max_gap.max(1),
        }
    }
}

/// Reads a source through one transport and fills the catalog.
pub struct Indexer {
    storage: Arc<dyn StorageAdapter>,
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressSink>,
    settings: IndexSettings,
}

#[derive(Default)]
struct Buffers {
    seen: HashSet<String>,
    batch: Vec<CatalogItem>,
    groups: BTreeMap<String, Vec<CatalogItem>>,
}

impl Indexer {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        transport: Arc<dyn Transport>,
        progress: Arc<dyn ProgressSink>,
        settings: IndexSettings,
    ) -> Self {
        Self {
            storage,
            transport,
            progress,
            settings,
        }
    }

    /// Scan the requested range.
    ///
    /// Cancellation is checked before each window; whatever was collected so
    /// far is still written. A transport failure other than throttling also
    /// writes the collected items before the error is returned.
    pub async fn run(
        &self,
        request: &IndexRequest,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, FerryError> {
        let mut report = IndexReport {
            last_sequence: request.offset.max(0),
            ..IndexReport::default()
        };
        let mut buffers = Buffers::default();
        let mut cursor = request.offset.max(0);
        // Sequence of the newest message seen, for gap detection.
        let mut last_found = cursor;

        info!(
            source = %request.source,
            offset = cursor,
            limit = request.limit,
            identity = %self.transport.identity(),
            "indexing started"
        );

        'scan: loop {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let want = match request.limit {
                0 => self.settings.window_size,
                limit => {
                    let left = limit.saturating_sub(report.processed);
                    self.settings.window_size.min(usize::try_from(left).unwrap_or(usize::MAX))
                }
            };
            if want == 0 {
                break;
            }

            let window = match self
                .transport
                .fetch_window(&request.source, cursor, want)
                .await
            {
                Ok(window) => window,
                Err(TransportError::Throttled { wait }) => {
                    warn!(secs = wait.as_secs(), cursor, "indexing throttled");
                    self.progress.report(Progress::Throttled { wait }).await;
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => {}
                    }
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, cursor, "indexing stopped by transport error");
                    self.finish(&mut buffers, request, &mut report).await?;
                    return Err(e.into());
                }
            };

            if window.scanned_to <= cursor {
                warn!(cursor, scanned_to = window.scanned_to, "source window did not advance; stopping");
                break;
            }

            for message in window.items {
                if request.limit > 0 && report.processed >= request.limit {
                    break 'scan;
                }
                report.last_sequence = message.sequence;
                last_found = message.sequence;

                let group = message.group_id.clone();
                let Some(item) = self.classify(request, message) else {
                    continue;
                };
                report.processed += 1;

                if !buffers.seen.insert(item.content_id.clone()) {
                    report.skipped += 1;
                } else if let Some(group) = group {
                    buffers.groups.entry(group).or_default().push(item);
                } else {
                    buffers.batch.push(item);
                    if buffers.batch.len() >= self.settings.batch_size {
                        self.flush(&mut buffers.batch, &mut report).await?;
                    }
                }

                if report.processed % self.settings.progress_every == 0 {
                    self.progress
                        .report(Progress::Indexed {
                            processed: report.processed,
                            saved: report.saved,
                            skipped: report.skipped,
                            last_sequence: report.last_sequence,
                        })
                        .await;
                }
            }
            cursor = window.scanned_to;

            if window.exhausted {
                break;
            }
            let gap = u64::try_from(cursor.saturating_sub(last_found)).unwrap_or(0);
            if gap >= self.settings.max_gap {
                info!(cursor, gap, "no messages in the last ids scanned; treating as end of source");
                break;
            }
        }

        self.finish(&mut buffers, request, &mut report).await?;
        info!(
            processed = report.processed,
            saved = report.saved,
            skipped = report.skipped,
            last_sequence = report.last_sequence,
            cancelled = report.cancelled,
            "indexing finished"
        );
        Ok(report)
    }

    /// Turn a source message into a catalog item, or drop it.
    fn classify(&self, request: &IndexRequest, message: SourceItem) -> Option<CatalogItem> {
        let source = &request.source;
        let seq = message.sequence;
        let (content_id, send_handle, display_name, kind) = match message.media {
            Some(media) => {
                if !request.filter.accepts(Some(media.kind)) {
                    return None;
                }
                let name = media
                    .display_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| format!("{}_{source}_{seq}", media.kind));
                (media.content_id, media.send_handle, name, media.kind)
            }
            None => {
                if !request.filter.accepts(None) {
                    return None;
                }
                (
                    format!("{source}_{seq}"),
                    None,
                    format!("message_{source}_{seq}"),
                    ItemKind::Message,
                )
            }
        };
        Some(CatalogItem {
            content_id,
            send_handle,
            display_name,
            source_location: source.clone(),
            kind,
            source_sequence: seq,
            identity: self.transport.identity(),
            caption: request.caption.clone().or(message.caption),
        })
    }

    async fn flush(
        &self,
        batch: &mut Vec<CatalogItem>,
        report: &mut IndexReport,
    ) -> Result<(), FerryError> {
        if batch.is_empty() {
            return Ok(());
        }
        let result = self.storage.insert_many_if_absent(batch).await?;
        debug!(saved = result.saved, skipped = result.skipped, "catalog batch written");
        report.saved += result.saved;
        report.skipped += result.skipped;
        batch.clear();
        Ok(())
    }

    /// Write buffered groups and the open batch.
    async fn finish(
        &self,
        buffers: &mut Buffers,
        request: &IndexRequest,
        report: &mut IndexReport,
    ) -> Result<(), FerryError> {
        for (_, mut members) in std::mem::take(&mut buffers.groups) {
            members.sort_by_key(|m| m.source_sequence);
            if request.caption.is_none() {
                let joined = members
                    .iter()
                    .filter_map(|m| m.caption.as_deref())
                    .filter(|c| !c.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if let Some(first) = members.first_mut() {
                    first.caption = if joined.is_empty() { None } else { Some(joined) };
                }
            }
            buffers.batch.extend(members);
            if buffers.batch.len() >= self.settings.batch_size {
                self.flush(&mut buffers.batch, report).await?;
            }
        }
        self.flush(&mut buffers.batch, report).await
    }
}
