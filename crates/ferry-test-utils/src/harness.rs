// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness: temp SQLite storage, both mock identities, and a config
//! tuned so tests never wait on real pauses.

use std::sync::Arc;

use ferry_config::model::{FerryConfig, StorageConfig};
use ferry_core::{CatalogItem, DestinationShard, FerryError, StorageAdapter, TransportIdentity};
use ferry_storage::SqliteStorage;

use crate::mock_transport::MockTransport;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    capacity_per_shard: u64,
    throttle_retries: u32,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            capacity_per_shard: 1_000,
            throttle_retries: 1,
        }
    }

    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity_per_shard = capacity;
        self
    }

    pub fn with_throttle_retries(mut self, retries: u32) -> Self {
        self.throttle_retries = retries;
        self
    }

    /// Build the test harness, creating a fresh database.
    pub async fn build(self) -> Result<TestHarness, FerryError> {
        let temp_dir =
            tempfile::TempDir::new().map_err(|e| FerryError::Storage { source: e.into() })?;
        let storage_config = StorageConfig {
            database_path: temp_dir.path().join("test.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(storage_config.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

        let mut config = FerryConfig {
            storage: storage_config,
            ..FerryConfig::default()
        };
        config.clone.capacity_per_shard = self.capacity_per_shard;
        config.clone.primary_pause_secs = 0;
        config.clone.throttle_retries = self.throttle_retries;
        config.governor.pause_min_secs = 0;
        config.governor.pause_max_secs = 0;

        Ok(TestHarness {
            storage,
            primary: Arc::new(MockTransport::new(TransportIdentity::Primary)),
            secondary: Arc::new(MockTransport::new(TransportIdentity::Secondary)),
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete test environment with mock transports and temp storage.
pub struct TestHarness {
    pub storage: Arc<dyn StorageAdapter>,
    pub primary: Arc<MockTransport>,
    pub secondary: Arc<MockTransport>,
    pub config: FerryConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Harness with default options.
    pub async fn new() -> Result<Self, FerryError> {
        Self::builder().build().await
    }

    /// Seed catalog rows directly.
    pub async fn seed_catalog(&self, items: &[CatalogItem]) -> Result<u64, FerryError> {
        Ok(self.storage.insert_many_if_absent(items).await?.saved)
    }

    /// Seed a shard plan directly.
    pub async fn seed_shards(&self, shards: &[DestinationShard]) -> Result<(), FerryError> {
        self.storage.replace_shards(shards).await?;
        Ok(())
    }
}
