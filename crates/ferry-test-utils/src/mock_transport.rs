// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! `MockTransport` serves source windows from seeded messages by sequence
//! range, so unseeded sequences behave like deleted messages. It records every
//! successful send, and fails calls from per-key scripts so tests can drive
//! throttling, stale handles, and refused destinations.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use ferry_core::traits::adapter::PluginAdapter;
use ferry_core::{
    AdapterType, FerryError, HealthStatus, ItemKind, SourceItem, SourceWindow, Transport,
    TransportError, TransportIdentity,
};

/// How an item reached its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMethod {
    Cached,
    Copy,
    /// Several source messages copied in one call.
    CopyMany,
}

/// One captured delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentRecord {
    pub destination: String,
    pub method: SendMethod,
    /// Content id for cached sends, `source:sequence[,sequence...]` for copies.
    pub key: String,
    pub caption: Option<String>,
}

/// A mock transport for one identity.
pub struct MockTransport {
    identity: TransportIdentity,
    sources: Arc<Mutex<BTreeMap<String, BTreeMap<i64, SourceItem>>>>,
    unreadable: Arc<Mutex<HashSet<String>>>,
    failures: Arc<Mutex<HashMap<String, VecDeque<TransportError>>>>,
    window_failures: Arc<Mutex<VecDeque<TransportError>>>,
    rejected: Arc<Mutex<HashMap<String, String>>>,
    sent: Arc<Mutex<Vec<SentRecord>>>,
    windows_served: Arc<Mutex<Vec<(i64, usize)>>>,
}

impl MockTransport {
    pub fn new(identity: TransportIdentity) -> Self {
        Self {
            identity,
            sources: Arc::new(Mutex::new(BTreeMap::new())),
            unreadable: Arc::new(Mutex::new(HashSet::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            window_failures: Arc::new(Mutex::new(VecDeque::new())),
            rejected: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            windows_served: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Key used to script and record copies of one source message.
    pub fn copy_key(source: &str, sequence: i64) -> String {
        format!("{source}:{sequence}")
    }

    /// Seed messages into a source.
    pub async fn add_source_items(&self, source: &str, items: impl IntoIterator<Item = SourceItem>) {
        let mut sources = self.sources.lock().await;
        let entry = sources.entry(source.to_string()).or_default();
        for item in items {
            entry.insert(item.sequence, item);
        }
    }

    /// Make `can_read` report false for a source.
    pub async fn set_unreadable(&self, source: &str) {
        self.unreadable.lock().await.insert(source.to_string());
    }

    /// Fail the next call on `key` (a content id or a [`Self::copy_key`]).
    pub async fn fail_next(&self, key: impl Into<String>, error: TransportError) {
        self.failures
            .lock()
            .await
            .entry(key.into())
            .or_default()
            .push_back(error);
    }

    /// Fail the next `fetch_item` call for one source message.
    pub async fn fail_next_fetch(&self, source: &str, sequence: i64, error: TransportError) {
        self.fail_next(Self::fetch_key(source, sequence), error).await;
    }

    fn fetch_key(source: &str, sequence: i64) -> String {
        format!("fetch:{source}:{sequence}")
    }

    /// Fail the next `fetch_window` call.
    pub async fn fail_next_window(&self, error: TransportError) {
        self.window_failures.lock().await.push_back(error);
    }

    /// Refuse every send to `destination` until [`Self::accept_destination`].
    pub async fn reject_destination(&self, destination: &str, reason: &str) {
        self.rejected
            .lock()
            .await
            .insert(destination.to_string(), reason.to_string());
    }

    pub async fn accept_destination(&self, destination: &str) {
        self.rejected.lock().await.remove(destination);
    }

    /// Get all captured deliveries in order.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// `(offset, limit)` of every window served.
    pub async fn windows_served(&self) -> Vec<(i64, usize)> {
        self.windows_served.lock().await.clone()
    }

    async fn check(&self, destination: &str, key: &str) -> Result<(), TransportError> {
        if let Some(reason) = self.rejected.lock().await.get(destination) {
            return Err(TransportError::DestinationUnavailable {
                destination: destination.to_string(),
                reason: reason.clone(),
            });
        }
        let scripted = self
            .failures
            .lock()
            .await
            .get_mut(key)
            .and_then(VecDeque::pop_front);
        match scripted {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn record(&self, destination: &str, method: SendMethod, key: String, caption: Option<&str>) {
        self.sent.lock().await.push(SentRecord {
            destination: destination.to_string(),
            method,
            key,
            caption: caption.map(str::to_string),
        });
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn identity(&self) -> TransportIdentity {
        self.identity
    }

    async fn send_cached(
        &self,
        destination: &str,
        content_id: &str,
        _kind: ItemKind,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        self.check(destination, content_id).await?;
        self.record(destination, SendMethod::Cached, content_id.to_string(), caption)
            .await;
        Ok(())
    }

    async fn copy_item(
        &self,
        destination: &str,
        source: &str,
        sequence: i64,
        caption: Option<&str>,
    ) -> Result<(), TransportError> {
        let key = Self::copy_key(source, sequence);
        self.check(destination, &key).await?;
        self.record(destination, SendMethod::Copy, key, caption).await;
        Ok(())
    }

    async fn copy_items(
        &self,
        destination: &str,
        source: &str,
        sequences: &[i64],
    ) -> Result<(), TransportError> {
        let first = sequences.first().copied().unwrap_or_default();
        self.check(destination, &Self::copy_key(source, first)).await?;
        let joined = sequences
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.record(destination, SendMethod::CopyMany, format!("{source}:{joined}"), None)
            .await;
        Ok(())
    }

    async fn fetch_item(
        &self,
        source: &str,
        sequence: i64,
    ) -> Result<Option<SourceItem>, TransportError> {
        let scripted = self
            .failures
            .lock()
            .await
            .get_mut(&Self::fetch_key(source, sequence))
            .and_then(VecDeque::pop_front);
        if let Some(error) = scripted {
            return Err(error);
        }
        Ok(self
            .sources
            .lock()
            .await
            .get(source)
            .and_then(|items| items.get(&sequence))
            .cloned())
    }

    async fn fetch_window(
        &self,
        source: &str,
        offset: i64,
        limit: usize,
    ) -> Result<SourceWindow, TransportError> {
        if let Some(error) = self.window_failures.lock().await.pop_front() {
            return Err(error);
        }
        self.windows_served.lock().await.push((offset, limit));
        let scanned_to = offset.saturating_add(i64::try_from(limit).unwrap_or(i64::MAX));
        let sources = self.sources.lock().await;
        let Some(messages) = sources.get(source) else {
            return Ok(SourceWindow {
                items: Vec::new(),
                scanned_to,
                exhausted: true,
            });
        };
        let first = offset.saturating_add(1);
        let items = if first <= scanned_to {
            messages
                .range(first..=scanned_to)
                .map(|(_, item)| item.clone())
                .collect()
        } else {
            Vec::new()
        };
        Ok(SourceWindow {
            items,
            scanned_to,
            exhausted: messages.range(scanned_to.saturating_add(1)..).next().is_none(),
        })
    }

    async fn can_read(&self, source: &str) -> bool {
        !self.unreadable.lock().await.contains(source)
    }
}
