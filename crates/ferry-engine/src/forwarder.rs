// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live forwarder: copies new posts from watched sources to their
//! destinations as they arrive.
//!
//! Parts of a multi-part group arrive as separate posts. The first part
//! opens a short settle window; when it closes, the collected parts are
//! copied in one call so the group stays together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferry_core::{FerryError, SourceItem, StorageAdapter, Transport, TransportError};
use tracing::{debug, warn};

type GroupKey = (String, String);

pub struct Forwarder {
    storage: Arc<dyn StorageAdapter>,
    transport: Arc<dyn Transport>,
    settle: Duration,
    groups: Mutex<HashMap<GroupKey, Vec<i64>>>,
}

impl Forwarder {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        transport: Arc<dyn Transport>,
        settle: Duration,
    ) -> Self {
        Self {
            storage,
            transport,
            settle,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one new post in `source`.
    ///
    /// Returns how many destinations received a copy now. Group parts are
    /// copied later by a background flush and count as zero here.
    pub async fn on_post(self: &Arc<Self>, source: &str, post: &SourceItem) -> Result<usize, FerryError> {
        let destinations = self.storage.destinations_for(source).await?;
        if destinations.is_empty() {
            return Ok(0);
        }

        if let Some(group) = &post.group_id {
            let key = (source.to_string(), group.clone());
            let opened = {
                let mut groups = self
                    .groups
                    .lock()
                    .map_err(|_| FerryError::Internal("forwarder group buffer poisoned".into()))?;
                let parts = groups.entry(key.clone()).or_default();
                parts.push(post.sequence);
                parts.len() == 1
            };
            if opened {
                let this = Arc::clone(self);
                tokio::spawn(async move {
                    tokio::time::sleep(this.settle).await;
                    if let Err(e) = this.flush_group(&key.0, &key.1).await {
                        warn!(source = %key.0, group = %key.1, error = %e, "group forward failed");
                    }
                });
            }
            return Ok(0);
        }

        let mut copied = 0;
        for destination in &destinations {
            if self.copy_with_retry(destination, source, &[post.sequence]).await {
                copied += 1;
            }
        }
        Ok(copied)
    }

    /// Copy the buffered parts of one group to every destination of its
    /// source. Returns how many destinations received it.
    pub async fn flush_group(&self, source: &str, group: &str) -> Result<usize, FerryError> {
        let parts = {
            let mut groups = self
                .groups
                .lock()
                .map_err(|_| FerryError::Internal("forwarder group buffer poisoned".into()))?;
            groups.remove(&(source.to_string(), group.to_string()))
        };
        let Some(mut parts) = parts else {
            return Ok(0);
        };
        parts.sort_unstable();
        parts.dedup();

        let destinations = self.storage.destinations_for(source).await?;
        let mut copied = 0;
        for destination in &destinations {
            if self.copy_with_retry(destination, source, &parts).await {
                copied += 1;
            }
        }
        debug!(source, group, parts = parts.len(), copied, "group forwarded");
        Ok(copied)
    }

    /// One copy attempt, plus a single retry after a throttling wait.
    async fn copy_with_retry(&self, destination: &str, source: &str, sequences: &[i64]) -> bool {
        let first = self.transport.copy_items(destination, source, sequences).await;
        let outcome = match first {
            Err(TransportError::Throttled { wait }) => {
                warn!(secs = wait.as_secs(), destination, "forward throttled; retrying once");
                tokio::time::sleep(wait).await;
                self.transport.copy_items(destination, source, sequences).await
            }
            other => other,
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                warn!(destination, source, error = %e, "forward failed");
                false
            }
        }
    }
}
