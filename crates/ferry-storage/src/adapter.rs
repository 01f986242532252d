// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use ferry_config::model::StorageConfig;
use ferry_core::{
    AdapterType, BatchInsert, CatalogItem, DeferredItem, DestinationShard, FerryError,
    ForwardRule, HealthStatus, PluginAdapter, StorageAdapter,
};

use crate::database::{Database, checkpoint};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// The database is opened on [`StorageAdapter::initialize`]; every other
/// call fails until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// The connection is not opened until `initialize` is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    fn db(&self) -> Result<&Database, FerryError> {
        self.db.get().ok_or_else(|| FerryError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, FerryError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), FerryError> {
        if let Some(db) = self.db.get() {
            checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), FerryError> {
        let db = Database::open_with(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| FerryError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), FerryError> {
        checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Catalog ---

    async fn insert_if_absent(&self, item: &CatalogItem) -> Result<bool, FerryError> {
        queries::catalog::insert_if_absent(self.db()?, item).await
    }

    async fn insert_many_if_absent(
        &self,
        items: &[CatalogItem],
    ) -> Result<BatchInsert, FerryError> {
        queries::catalog::insert_many_if_absent(self.db()?, items).await
    }

    async fn catalog_count(&self) -> Result<u64, FerryError> {
        queries::catalog::count(self.db()?).await
    }

    async fn fetch_catalog(&self) -> Result<Vec<CatalogItem>, FerryError> {
        queries::catalog::fetch_all(self.db()?).await
    }

    async fn fetch_catalog_page(&self, limit: usize) -> Result<Vec<CatalogItem>, FerryError> {
        queries::catalog::fetch_page(self.db()?, limit).await
    }

    async fn delete_item(
        &self,
        content_id: &str,
        source_location: &str,
        source_sequence: i64,
    ) -> Result<bool, FerryError> {
        queries::catalog::delete(self.db()?, content_id, source_location, source_sequence).await
    }

    async fn clear_catalog(&self) -> Result<bool, FerryError> {
        queries::catalog::delete_all(self.db()?).await
    }

    // --- Destination ledger ---

    async fn replace_shards(&self, shards: &[DestinationShard]) -> Result<bool, FerryError> {
        queries::shards::replace_all(self.db()?, shards).await
    }

    async fn fetch_shards(&self) -> Result<Vec<DestinationShard>, FerryError> {
        queries::shards::fetch_all(self.db()?).await
    }

    async fn fetch_shard(&self, shard_index: u32) -> Result<Option<DestinationShard>, FerryError> {
        queries::shards::fetch_by_index(self.db()?, shard_index).await
    }

    async fn increment_shard(&self, destination_id: &str, delta: u64) -> Result<bool, FerryError> {
        queries::shards::increment(self.db()?, destination_id, delta).await
    }

    async fn clear_shards(&self) -> Result<bool, FerryError> {
        queries::shards::clear_all(self.db()?).await
    }

    async fn record_delivery(
        &self,
        item: &CatalogItem,
        destination_id: &str,
    ) -> Result<bool, FerryError> {
        queries::shards::record_delivery(self.db()?, item, destination_id).await
    }

    // --- Caption template ---

    async fn set_caption_template(&self, template: &str) -> Result<(), FerryError> {
        queries::captions::set(self.db()?, template).await
    }

    async fn caption_template(&self) -> Result<Option<String>, FerryError> {
        queries::captions::get(self.db()?).await
    }

    async fn clear_caption_template(&self) -> Result<bool, FerryError> {
        queries::captions::clear(self.db()?).await
    }

    // --- Deferred items ---

    async fn defer_item(&self, item: &CatalogItem, reason: &str) -> Result<(), FerryError> {
        queries::deferred::defer(self.db()?, item, reason).await
    }

    async fn deferred_count(&self) -> Result<u64, FerryError> {
        queries::deferred::count(self.db()?).await
    }

    async fn fetch_deferred(&self) -> Result<Vec<DeferredItem>, FerryError> {
        queries::deferred::fetch_all(self.db()?).await
    }

    async fn requeue_deferred(&self) -> Result<u64, FerryError> {
        queries::deferred::requeue_all(self.db()?).await
    }

    // --- Forward rules ---

    async fn add_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError> {
        queries::forward_rules::add(self.db()?, rule).await
    }

    async fn remove_forward_rule(&self, rule: &ForwardRule) -> Result<bool, FerryError> {
        queries::forward_rules::remove(self.db()?, rule).await
    }

    async fn forward_rules(&self) -> Result<Vec<ForwardRule>, FerryError> {
        queries::forward_rules::list(self.db()?).await
    }

    async fn destinations_for(&self, source: &str) -> Result<Vec<String>, FerryError> {
        queries::forward_rules::destinations_for(self.db()?, source).await
    }
}
