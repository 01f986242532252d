// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator-facing operations shared by every front-end.

use std::sync::{Arc, Mutex};

use ferry_config::model::FerryConfig;
use ferry_core::{
    DestinationShard, FerryError, ForwardRule, RunStatus, StorageAdapter, Transport,
    TransportError,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::allocator::{self, DestinationPrompt};
use crate::governor::RateGovernor;
use crate::indexer::{IndexReport, IndexRequest, IndexSettings, Indexer};
use crate::progress::ProgressSink;
use crate::pump::{DeliverySummary, Pump, PumpSettings, RunState, Transports};
use crate::resume::{self, ResumePoint};
use crate::run_lock::RunLock;

/// Row counts across the persistent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Totals {
    pub catalog: u64,
    pub deferred: u64,
}

/// Snapshot of the two job slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineStatus {
    pub clone: RunStatus,
    pub indexing: bool,
}

/// The clone engine: storage, both senders, and the job slots.
pub struct Engine {
    config: FerryConfig,
    storage: Arc<dyn StorageAdapter>,
    transports: Transports,
    index_lock: RunLock,
    clone_lock: RunLock,
    index_cancel: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl Engine {
    /// `shutdown` stops any running job at its next checkpoint.
    pub fn new(
        config: FerryConfig,
        storage: Arc<dyn StorageAdapter>,
        transports: Transports,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            storage,
            transports,
            index_lock: RunLock::new("indexing"),
            clone_lock: RunLock::new("clone run"),
            index_cancel: Mutex::new(None),
            shutdown,
        }
    }

    pub fn config(&self) -> &FerryConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn transports(&self) -> &Transports {
        &self.transports
    }

    /// First identity, primary before secondary, that can read `source`.
    pub async fn reader_for(&self, source: &str) -> Result<Arc<dyn Transport>, FerryError> {
        if self.transports.primary.can_read(source).await {
            return Ok(Arc::clone(&self.transports.primary));
        }
        if let Some(secondary) = &self.transports.secondary
            && secondary.can_read(source).await
        {
            return Ok(Arc::clone(secondary));
        }
        Err(TransportError::SourceUnavailable {
            source_location: source.to_string(),
            reason: "no configured identity can read it".into(),
        }
        .into())
    }

    /// Index one source range. Only one indexing job runs at a time.
    pub async fn index(
        &self,
        request: IndexRequest,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<IndexReport, FerryError> {
        if request.source.trim().is_empty() {
            return Err(FerryError::Validation("source must not be empty".into()));
        }
        if request.offset < 0 {
            return Err(FerryError::Validation("offset must not be negative".into()));
        }
        let _guard = self.index_lock.try_acquire()?;
        let transport = self.reader_for(&request.source).await?;

        let cancel = self.shutdown.child_token();
        self.set_index_cancel(Some(cancel.clone()));
        let indexer = Indexer::new(
            Arc::clone(&self.storage),
            transport,
            progress,
            IndexSettings::from(&self.config.index),
        );
        let result = indexer.run(&request, &cancel).await;
        self.set_index_cancel(None);
        result
    }

    /// Stop the running indexing job before its next page. Returns whether
    /// one was running.
    pub fn cancel_index(&self) -> bool {
        let token = match self.index_cancel.lock() {
            Ok(slot) => slot.clone(),
            Err(_) => None,
        };
        match token {
            Some(token) => {
                token.cancel();
                info!("indexing cancellation requested");
                true
            }
            None => false,
        }
    }

    fn set_index_cancel(&self, token: Option<CancellationToken>) {
        match self.index_cancel.lock() {
            Ok(mut slot) => *slot = token,
            Err(_) => warn!("index cancel slot poisoned"),
        }
    }

    /// Plan shards for the whole catalog and deliver it.
    pub async fn start_clone(
        &self,
        first_destination: &str,
        prompt: &dyn DestinationPrompt,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<DeliverySummary, FerryError> {
        let guard = self.clone_lock.try_acquire()?;
        allocator::allocate(
            self.storage.as_ref(),
            prompt,
            first_destination,
            self.config.clone.capacity_per_shard,
        )
        .await?;
        let state = RunState::new(RateGovernor::new(&self.config.governor));
        self.pump(progress).run(state, &guard, &self.shutdown).await.result
    }

    /// Continue an interrupted plan. `Ok(None)` when there is nothing to
    /// resume.
    pub async fn resume(
        &self,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<Option<DeliverySummary>, FerryError> {
        let guard = self.clone_lock.try_acquire()?;
        let delivered = match resume::resume_point(self.storage.as_ref()).await? {
            ResumePoint::NothingToResume => return Ok(None),
            ResumePoint::Resume { delivered, .. } => delivered,
        };
        let state = RunState::resuming(delivered, RateGovernor::new(&self.config.governor));
        self.pump(progress)
            .run(state, &guard, &self.shutdown)
            .await
            .result
            .map(Some)
    }

    fn pump(&self, progress: Arc<dyn ProgressSink>) -> Pump {
        Pump::new(
            Arc::clone(&self.storage),
            self.transports.clone(),
            progress,
            PumpSettings::from(&self.config.clone),
        )
    }

    pub async fn totals(&self) -> Result<Totals, FerryError> {
        Ok(Totals {
            catalog: self.storage.catalog_count().await?,
            deferred: self.storage.deferred_count().await?,
        })
    }

    pub async fn shards(&self) -> Result<Vec<DestinationShard>, FerryError> {
        self.storage.fetch_shards().await
    }

    /// Wipe the catalog and the shard plan. Refused while any job runs.
    pub async fn reset(&self) -> Result<(), FerryError> {
        let _clone = self.clone_lock.try_acquire()?;
        let _index = self.index_lock.try_acquire()?;
        self.storage.clear_catalog().await?;
        self.storage.clear_shards().await?;
        info!("catalog and shard plan cleared");
        Ok(())
    }

    /// Drop the shard plan and keep the catalog, so a new plan can be made.
    /// Returns how many shards were dropped. Refused during a clone run.
    pub async fn clear_plan(&self) -> Result<usize, FerryError> {
        let _guard = self.clone_lock.try_acquire()?;
        let dropped = self.storage.fetch_shards().await?.len();
        self.storage.clear_shards().await?;
        info!(dropped, "shard plan cleared");
        Ok(dropped)
    }

    pub async fn set_caption(&self, template: &str) -> Result<(), FerryError> {
        if template.trim().is_empty() {
            return Err(FerryError::Validation("caption template must not be empty".into()));
        }
        self.storage.set_caption_template(template).await
    }

    pub async fn caption(&self) -> Result<Option<String>, FerryError> {
        self.storage.caption_template().await
    }

    pub async fn clear_caption(&self) -> Result<bool, FerryError> {
        self.storage.clear_caption_template().await
    }

    /// Move deferred items back into the catalog. Refused during a clone run.
    pub async fn requeue(&self) -> Result<u64, FerryError> {
        let _guard = self.clone_lock.try_acquire()?;
        let moved = self.storage.requeue_deferred().await?;
        info!(moved, "deferred items requeued");
        Ok(moved)
    }

    pub async fn add_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError> {
        if rule.source.trim().is_empty() || rule.destination.trim().is_empty() {
            return Err(FerryError::Validation(
                "forward rules need a source and a destination".into(),
            ));
        }
        if rule.source == rule.destination {
            return Err(FerryError::Validation(
                "a chat cannot forward into itself".into(),
            ));
        }
        self.storage.add_forward_rule(rule).await
    }

    pub async fn remove_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError> {
        self.storage.remove_forward_rule(rule).await
    }

    pub async fn forward_rules(&self) -> Result<Vec<ForwardRule>, FerryError> {
        self.storage.forward_rules().await
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            clone: self.clone_lock.status(),
            indexing: self.index_lock.is_running(),
        }
    }

    /// Clone status changes, for front-ends that display them live.
    pub fn subscribe_clone_status(&self) -> watch::Receiver<RunStatus> {
        self.clone_lock.subscribe()
    }
}
