// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch pump: drains the catalog into the destination shards.
//!
//! Items leave the catalog in discovery order. Each one goes to the shard its
//! cumulative position maps to, is sent by the identity recorded at index
//! time, and on success is deleted and credited in one storage transaction.
//! Every item the pump touches leaves the catalog: delivered, deferred, or the
//! run halts on it.

use std::sync::Arc;
use std::time::Duration;

use ferry_config::model::CloneConfig;
use ferry_core::{
    CatalogItem, DestinationShard, FerryError, RunStatus, StorageAdapter, Transport,
    TransportError, TransportIdentity,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::caption;
use crate::governor::RateGovernor;
use crate::progress::{Progress, ProgressSink};
use crate::run_lock::RunGuard;

/// Items read from the catalog per page.
const PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Copy)]
pub struct PumpSettings {
    pub capacity_per_shard: u64,
    pub primary_pause: Duration,
    pub progress_every: u64,
    pub throttle_retries: u32,
}

impl From<&CloneConfig> for PumpSettings {
    fn from(config: &CloneConfig) -> Self {
        Self {
            capacity_per_shard: config.capacity_per_shard.max(1),
            primary_pause: Duration::from_secs(config.primary_pause_secs),
            progress_every: config.progress_every.max(1),
            throttle_retries: config.throttle_retries,
        }
    }
}

/// The two senders, by identity.
#[derive(Clone)]
pub struct Transports {
    pub primary: Arc<dyn Transport>,
    pub secondary: Option<Arc<dyn Transport>>,
}

impl Transports {
    pub fn get(&self, identity: TransportIdentity) -> Result<&Arc<dyn Transport>, FerryError> {
        match identity {
            TransportIdentity::Primary => Ok(&self.primary),
            TransportIdentity::Secondary => self.secondary.as_ref().ok_or_else(|| {
                FerryError::Config("items need the secondary identity but none is configured".into())
            }),
        }
    }
}

/// Mutable state of one clone run, handed to the pump and back.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Items delivered across the whole plan, including earlier sessions.
    pub delivered: u64,
    pub deferred: u64,
    pub shard_index: u32,
    pub governor: RateGovernor,
    pub status: RunStatus,
}

impl RunState {
    pub fn new(governor: RateGovernor) -> Self {
        Self::resuming(0, governor)
    }

    /// State for a run that continues after `delivered` earlier deliveries.
    pub fn resuming(delivered: u64, governor: RateGovernor) -> Self {
        Self {
            delivered,
            deferred: 0,
            shard_index: 1,
            governor,
            status: RunStatus::Idle,
        }
    }
}

/// Totals of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: u64,
    pub deferred: u64,
    /// The plan as it stood at the end of the run.
    pub shards: Vec<DestinationShard>,
    pub cancelled: bool,
}

/// Result of a pump run together with the state it ended in.
#[derive(Debug)]
pub struct PumpOutcome {
    pub state: RunState,
    pub result: Result<DeliverySummary, FerryError>,
}

enum Attempt {
    Delivered,
    Failed(TransportError),
    Refused(String),
    /// Cancelled while waiting out a throttle; the item stays in the catalog.
    Interrupted,
}

pub struct Pump {
    storage: Arc<dyn StorageAdapter>,
    transports: Transports,
    progress: Arc<dyn ProgressSink>,
    settings: PumpSettings,
}

impl Pump {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        transports: Transports,
        progress: Arc<dyn ProgressSink>,
        settings: PumpSettings,
    ) -> Self {
        Self {
            storage,
            transports,
            progress,
            settings,
        }
    }

    /// Deliver the catalog until it is empty, a destination fails, or
    /// `cancel` fires.
    ///
    /// On normal completion the ledger is cleared. A halt or a cancellation
    /// leaves the ledger in place so the run can be resumed.
    pub async fn run(
        &self,
        mut state: RunState,
        guard: &RunGuard,
        cancel: &CancellationToken,
    ) -> PumpOutcome {
        set_status(&mut state, guard, RunStatus::Running);
        let result = self.drain(&mut state, guard, cancel).await;
        set_status(&mut state, guard, RunStatus::Idle);
        if let Err(e) = &result {
            error!(error = %e, delivered = state.delivered, "clone run halted");
        }
        PumpOutcome { state, result }
    }

    async fn drain(
        &self,
        state: &mut RunState,
        guard: &RunGuard,
        cancel: &CancellationToken,
    ) -> Result<DeliverySummary, FerryError> {
        let template = self.storage.caption_template().await?;
        let mut cancelled = false;

        'drain: loop {
            let page = self.storage.fetch_catalog_page(PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            for item in &page {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'drain;
                }
                self.deliver(state, guard, cancel, item, template.as_deref())
                    .await?;
            }
        }

        let shards = self.storage.fetch_shards().await?;
        if cancelled {
            info!(delivered = state.delivered, "clone run cancelled; plan kept for resume");
        } else {
            self.storage.clear_shards().await?;
            info!(
                delivered = state.delivered,
                deferred = state.deferred,
                "clone run complete"
            );
        }
        Ok(DeliverySummary {
            delivered: state.delivered,
            deferred: state.deferred,
            shards,
            cancelled,
        })
    }

    /// Shard for the next delivery: the cumulative position decides, the first
    /// shard catches anything past the plan.
    async fn resolve_shard(&self, delivered: u64) -> Result<DestinationShard, FerryError> {
        let index = u32::try_from(delivered / self.settings.capacity_per_shard + 1)
            .unwrap_or(u32::MAX);
        if let Some(shard) = self.storage.fetch_shard(index).await? {
            return Ok(shard);
        }
        self.storage
            .fetch_shard(1)
            .await?
            .ok_or(FerryError::NoDestination)
    }

    async fn deliver(
        &self,
        state: &mut RunState,
        guard: &RunGuard,
        cancel: &CancellationToken,
        item: &CatalogItem,
        template: Option<&str>,
    ) -> Result<(), FerryError> {
        let shard = self.resolve_shard(state.delivered).await?;
        let transport = self.transports.get(item.identity)?;
        let secondary = item.identity == TransportIdentity::Secondary;

        if secondary && let Some(cooldown) = state.governor.before_send() {
            info!(
                tier = cooldown.tier,
                secs = cooldown.duration.as_secs(),
                delivered = state.delivered,
                "cooling down"
            );
            set_status(state, guard, RunStatus::CoolingDown);
            self.progress
                .report(Progress::CoolingDown {
                    tier: cooldown.tier,
                    duration: cooldown.duration,
                    delivered: state.delivered,
                })
                .await;
            pause(cooldown.duration, cancel).await;
            set_status(state, guard, RunStatus::Running);
            if cancel.is_cancelled() {
                return Ok(());
            }
        }

        let caption = caption::render(template, &item.display_name, item.caption.as_deref());
        match self
            .attempt(transport.as_ref(), &shard, item, caption.as_deref(), cancel)
            .await?
        {
            Attempt::Delivered => {
                let credited = self
                    .storage
                    .record_delivery(item, &shard.destination_id)
                    .await?;
                if !credited {
                    warn!(
                        destination = %shard.destination_id,
                        shard = shard.shard_index,
                        "delivered past the shard's planned size"
                    );
                }
                state.delivered += 1;
                state.shard_index = shard.shard_index;

                if state.delivered % self.settings.progress_every == 0 {
                    let shard_pending = self
                        .storage
                        .fetch_shard(shard.shard_index)
                        .await?
                        .map_or(0, |s| s.pending_count);
                    self.progress
                        .report(Progress::Delivered {
                            delivered: state.delivered,
                            shard_index: shard.shard_index,
                            shard_pending,
                        })
                        .await;
                }

                let wait = if secondary {
                    state.governor.after_delivery()
                } else {
                    self.settings.primary_pause
                };
                pause(wait, cancel).await;
            }
            Attempt::Refused(reason) => {
                return Err(FerryError::DestinationAccess {
                    shard_index: shard.shard_index,
                    destination_id: shard.destination_id,
                    delivered: state.delivered,
                    reason,
                });
            }
            Attempt::Failed(e) => {
                error!(
                    content_id = %item.content_id,
                    source = %item.source_location,
                    sequence = item.source_sequence,
                    error = %e,
                    "delivery failed; item deferred"
                );
                self.storage.defer_item(item, &e.to_string()).await?;
                state.deferred += 1;
            }
            Attempt::Interrupted => {
                debug!(content_id = %item.content_id, "throttle wait cancelled");
            }
        }
        Ok(())
    }

    /// Send one item, riding out throttling up to the retry limit.
    ///
    /// An unavailable destination comes back as [`Attempt::Refused`], which
    /// halts the run.
    async fn attempt(
        &self,
        transport: &dyn Transport,
        shard: &DestinationShard,
        item: &CatalogItem,
        caption: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Attempt, FerryError> {
        let mut retries = 0;
        loop {
            match send(transport, &shard.destination_id, item, caption).await {
                Ok(()) => return Ok(Attempt::Delivered),
                Err(TransportError::Throttled { wait }) if retries < self.settings.throttle_retries => {
                    retries += 1;
                    warn!(
                        secs = wait.as_secs(),
                        content_id = %item.content_id,
                        retry = retries,
                        "throttled; waiting before retry"
                    );
                    self.progress.report(Progress::Throttled { wait }).await;
                    pause(wait, cancel).await;
                    if cancel.is_cancelled() {
                        return Ok(Attempt::Interrupted);
                    }
                }
                Err(TransportError::DestinationUnavailable { reason, .. }) => {
                    return Ok(Attempt::Refused(reason));
                }
                Err(e) => return Ok(Attempt::Failed(e)),
            }
        }
    }
}

/// Media goes by cached handle, falling back to a copy of the source message
/// when the handle is stale. Bare messages are always copied.
async fn send(
    transport: &dyn Transport,
    destination: &str,
    item: &CatalogItem,
    caption: Option<&str>,
) -> Result<(), TransportError> {
    if !item.kind.is_media() {
        return transport
            .copy_item(destination, &item.source_location, item.source_sequence, caption)
            .await;
    }
    match transport
        .send_cached(destination, item.handle(), item.kind, caption)
        .await
    {
        Err(TransportError::InvalidHandle(reason)) => {
            debug!(content_id = %item.content_id, %reason, "stale handle; copying from source");
            match transport
                .fetch_item(&item.source_location, item.source_sequence)
                .await
            {
                Ok(Some(_)) => {
                    transport
                        .copy_item(destination, &item.source_location, item.source_sequence, caption)
                        .await
                }
                Ok(None) => Err(TransportError::SourceUnavailable {
                    source_location: item.source_location.clone(),
                    reason: format!("message {} no longer exists", item.source_sequence),
                }),
                Err(e @ TransportError::Throttled { .. }) => Err(e),
                // Reading the source never blames the destination.
                Err(e) => Err(TransportError::SourceUnavailable {
                    source_location: item.source_location.clone(),
                    reason: e.to_string(),
                }),
            }
        }
        other => other,
    }
}

fn set_status(state: &mut RunState, guard: &RunGuard, status: RunStatus) {
    state.status = status;
    guard.set_status(status);
}

async fn pause(duration: Duration, cancel: &CancellationToken) {
    if duration.is_zero() {
        return;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = cancel.cancelled() => {}
    }
}
