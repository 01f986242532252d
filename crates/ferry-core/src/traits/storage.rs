// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the catalog, the destination ledger, and the
//! small tables around them.

use async_trait::async_trait;

use crate::error::FerryError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{BatchInsert, CatalogItem, DeferredItem, DestinationShard, ForwardRule};

/// Adapter for persistence backends.
///
/// Every write is a short transactional call; nothing is held open across
/// awaits on other resources.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), FerryError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), FerryError>;

    // --- Catalog ---

    /// Insert one item unless its content id is already present.
    async fn insert_if_absent(&self, item: &CatalogItem) -> Result<bool, FerryError>;

    /// Insert a batch atomically; counts come from the catalog size delta.
    async fn insert_many_if_absent(&self, items: &[CatalogItem])
    -> Result<BatchInsert, FerryError>;

    async fn catalog_count(&self) -> Result<u64, FerryError>;

    /// All remaining items in discovery order.
    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, FerryError>;

    /// The oldest `limit` remaining items.
    async fn fetch_catalog_page(&self, limit: usize) -> Result<Vec<CatalogItem>, FerryError>;

    async fn delete_item(
        &self,
        content_id: &str,
        source_location: &str,
        source_sequence: i64,
    ) -> Result<bool, FerryError>;

    async fn clear_catalog(&self) -> Result<bool, FerryError>;

    // --- Destination ledger ---

    /// Replace the whole shard plan in one transaction.
    async fn replace_shards(&self, shards: &[DestinationShard]) -> Result<bool, FerryError>;

    /// All shards ordered by index.
    async fn fetch_shards(&self) -> Result<Vec<DestinationShard>, FerryError>;

    async fn fetch_shard(&self, shard_index: u32) -> Result<Option<DestinationShard>, FerryError>;

    /// Move `delta` units from pending to delivered on one shard.
    async fn increment_shard(&self, destination_id: &str, delta: u64) -> Result<bool, FerryError>;

    async fn clear_shards(&self) -> Result<bool, FerryError>;

    /// Delete a delivered item and credit its shard in one transaction.
    ///
    /// Returns whether the shard had a pending unit to credit.
    async fn record_delivery(
        &self,
        item: &CatalogItem,
        destination_id: &str,
    ) -> Result<bool, FerryError>;

    // --- Caption template ---

    async fn set_caption_template(&self, template: &str) -> Result<(), FerryError>;

    async fn caption_template(&self) -> Result<Option<String>, FerryError>;

    async fn clear_caption_template(&self) -> Result<bool, FerryError>;

    // --- Deferred items ---

    /// Move an item from the catalog to the deferred table in one transaction.
    async fn defer_item(&self, item: &CatalogItem, reason: &str) -> Result<(), FerryError>;

    async fn deferred_count(&self) -> Result<u64, FerryError>;

    async fn fetch_deferred(&self) -> Result<Vec<DeferredItem>, FerryError>;

    /// Move every deferred item back into the catalog. Returns how many moved.
    async fn requeue_deferred(&self) -> Result<u64, FerryError>;

    // --- Forward rules ---

    async fn add_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError>;

    async fn remove_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError>;

    async fn forward_rules(&self) -> Result<Vec<ForwardRule>, FerryError>;

    async fn destinations_for(&self, source: &str) -> Result<Vec<String>, FerryError>;
}
