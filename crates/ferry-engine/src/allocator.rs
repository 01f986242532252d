// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shard allocator: splits the catalog across destinations of fixed capacity.

use std::collections::HashSet;

use async_trait::async_trait;
use ferry_core::{DestinationShard, FerryError, StorageAdapter};
use tracing::info;

/// Source of the extra destinations a plan needs beyond the first.
#[async_trait]
pub trait DestinationPrompt: Send + Sync {
    /// Ask for the destination of `shard_index`, which will receive `pending`
    /// items.
    async fn destination_for(&self, shard_index: u32, pending: u64) -> Result<String, FerryError>;
}

/// A prompt with a fixed answer list, for scripted front-ends and tests.
#[derive(Debug, Clone, Default)]
pub struct FixedDestinations(pub Vec<String>);

#[async_trait]
impl DestinationPrompt for FixedDestinations {
    async fn destination_for(&self, shard_index: u32, _pending: u64) -> Result<String, FerryError> {
        // Shard 1 comes from the operator directly; the list starts at shard 2.
        let slot = shard_index.saturating_sub(2) as usize;
        self.0.get(slot).cloned().ok_or_else(|| {
            FerryError::Validation(format!("no destination supplied for shard {shard_index}"))
        })
    }
}

/// Number of shards needed for `total` items: `ceil(total / capacity)`.
pub fn shard_count(total: u64, capacity: u64) -> u64 {
    if capacity == 0 {
        return 0;
    }
    total.div_ceil(capacity)
}

/// Planned size of each shard, in fill order.
///
/// Every shard but the last is full; the sizes sum to `total`.
pub fn plan_sizes(total: u64, capacity: u64) -> Vec<u64> {
    (0..shard_count(total, capacity))
        .map(|i| capacity.min(total - i * capacity))
        .collect()
}

/// Build and persist a fresh shard plan.
///
/// Refuses to overwrite a plan that still has pending work. The whole plan is
/// written in one transaction.
pub async fn allocate(
    storage: &dyn StorageAdapter,
    prompt: &dyn DestinationPrompt,
    first_destination: &str,
    capacity: u64,
) -> Result<Vec<DestinationShard>, FerryError> {
    if capacity == 0 {
        return Err(FerryError::Validation("shard capacity must be at least 1".into()));
    }
    let first_destination = first_destination.trim();
    if first_destination.is_empty() {
        return Err(FerryError::Validation("destination must not be empty".into()));
    }

    let pending: u64 = storage
        .fetch_shards()
        .await?
        .iter()
        .map(|s| s.pending_count)
        .sum();
    if pending > 0 {
        return Err(FerryError::PlanInProgress { pending });
    }

    let total = storage.catalog_count().await?;
    if total == 0 {
        return Err(FerryError::Validation(
            "the catalog is empty; index a source first".into(),
        ));
    }

    let sizes = plan_sizes(total, capacity);
    let mut seen = HashSet::new();
    let mut shards = Vec::with_capacity(sizes.len());
    for (i, &size) in sizes.iter().enumerate() {
        let shard_index = u32::try_from(i + 1)
            .map_err(|_| FerryError::Validation("too many shards for one plan".into()))?;
        let destination = if shard_index == 1 {
            first_destination.to_string()
        } else {
            prompt
                .destination_for(shard_index, size)
                .await?
                .trim()
                .to_string()
        };
        if destination.is_empty() {
            return Err(FerryError::Validation(format!(
                "destination for shard {shard_index} must not be empty"
            )));
        }
        if !seen.insert(destination.clone()) {
            return Err(FerryError::Validation(format!(
                "destination {destination} appears twice in the plan"
            )));
        }
        shards.push(DestinationShard::new(destination, shard_index, size));
    }

    storage.replace_shards(&shards).await?;
    info!(total, shards = shards.len(), capacity, "shard plan written");
    Ok(shards)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn plan_for_two_and_a_half_million() {
        assert_eq!(
            plan_sizes(2_500_000, 980_000),
            vec![980_000, 980_000, 540_000]
        );
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        assert_eq!(plan_sizes(2_000, 1_000), vec![1_000, 1_000]);
        assert_eq!(shard_count(2_000, 1_000), 2);
    }

    #[test]
    fn small_catalog_fits_one_shard() {
        assert_eq!(plan_sizes(5, 980_000), vec![5]);
        assert!(plan_sizes(0, 10).is_empty());
        assert_eq!(shard_count(10, 0), 0);
    }

    #[tokio::test]
    async fn fixed_destinations_start_at_shard_two() {
        let prompt = FixedDestinations(vec!["-2".into(), "-3".into()]);
        assert_eq!(prompt.destination_for(2, 10).await.unwrap(), "-2");
        assert_eq!(prompt.destination_for(3, 10).await.unwrap(), "-3");
        assert!(prompt.destination_for(4, 10).await.is_err());
    }

    proptest! {
        #[test]
        fn sizes_conserve_total(total in 0u64..5_000_000, capacity in 1_000u64..2_000_000) {
            let sizes = plan_sizes(total, capacity);
            prop_assert_eq!(sizes.iter().sum::<u64>(), total);
            prop_assert_eq!(sizes.len() as u64, shard_count(total, capacity));
            prop_assert!(sizes.iter().all(|&s| s >= 1 && s <= capacity));
            if let Some((last, full)) = sizes.split_last() {
                prop_assert!(full.iter().all(|&s| s == capacity));
                prop_assert!(*last <= capacity);
            }
        }
    }
}
