// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resume controller: rebuilds the delivery position from the ledger.

use ferry_core::{FerryError, StorageAdapter};
use tracing::info;

/// Where an interrupted plan picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumePoint {
    /// No shard has pending work.
    NothingToResume,
    Resume {
        /// Deliveries already credited across every shard.
        delivered: u64,
        /// Items still owed across every shard.
        pending: u64,
    },
}

/// Inspect the ledger.
///
/// The cumulative delivered count is the sum of all shards' delivered
/// counts, so the next delivery maps back to the same shard the interrupted
/// run was filling.
pub async fn resume_point(storage: &dyn StorageAdapter) -> Result<ResumePoint, FerryError> {
    let shards = storage.fetch_shards().await?;
    let pending: u64 = shards.iter().map(|s| s.pending_count).sum();
    if pending == 0 {
        return Ok(ResumePoint::NothingToResume);
    }
    let delivered = shards.iter().map(|s| s.delivered_count).sum();
    info!(delivered, pending, shards = shards.len(), "resuming clone plan");
    Ok(ResumePoint::Resume { delivered, pending })
}
