// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Ferry clone engine.
//!
//! This crate provides the trait definitions, error types, and common types
//! used throughout the Ferry workspace. Storage backends and message
//! transports implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{FerryError, TransportError};
pub use types::{
    AdapterType, BatchInsert, CatalogItem, CategoryFilter, DeferredItem, DestinationShard,
    ForwardRule, HealthStatus, ItemKind, MediaRef, RunStatus, ShardState, SourceItem,
    SourceWindow, TransportIdentity,
};

pub use traits::{PluginAdapter, StorageAdapter, Transport};
