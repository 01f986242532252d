// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the catalog, the ledger, and the transports.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
}

/// Kind of a forwardable unit. `Message` is a bare message without media.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Document,
    Photo,
    Video,
    Audio,
    Message,
}

impl ItemKind {
    /// Media kinds can be re-sent from a cached content handle.
    pub fn is_media(self) -> bool {
        !matches!(self, ItemKind::Message)
    }
}

/// Which of the two interchangeable senders delivers an item.
///
/// The primary identity is fast and unthrottled by us; the secondary identity
/// is paced by the rate governor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransportIdentity {
    Primary,
    Secondary,
}

/// One row of remaining work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Deduplication key.
    pub content_id: String,
    /// Sendable reference when the service keys content differently.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_handle: Option<String>,
    pub display_name: String,
    pub source_location: String,
    pub kind: ItemKind,
    pub source_sequence: i64,
    pub identity: TransportIdentity,
    pub caption: Option<String>,
}

impl CatalogItem {
    /// Reference passed to [`Transport::send_cached`](crate::Transport::send_cached).
    pub fn handle(&self) -> &str {
        self.send_handle.as_deref().unwrap_or(&self.content_id)
    }
}

/// Fill state of a destination shard.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ShardState {
    Pending,
    Active,
    Complete,
}

/// One destination and its share of the backlog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationShard {
    pub destination_id: String,
    /// 1-based fill order.
    pub shard_index: u32,
    pub pending_count: u64,
    pub delivered_count: u64,
    pub state: ShardState,
}

impl DestinationShard {
    pub fn new(destination_id: impl Into<String>, shard_index: u32, pending_count: u64) -> Self {
        Self {
            destination_id: destination_id.into(),
            shard_index,
            pending_count,
            delivered_count: 0,
            state: ShardState::Pending,
        }
    }

    /// Planned size of this shard; constant across deliveries.
    pub fn planned(&self) -> u64 {
        self.pending_count + self.delivered_count
    }
}

/// Which item kinds an indexing job keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Every item; media-less messages become bare message references.
    All,
    DocumentsAndVideos,
    Only(ItemKind),
}

impl CategoryFilter {
    /// Whether an item of `kind` (`None` for no media) passes the filter.
    pub fn accepts(self, kind: Option<ItemKind>) -> bool {
        match (self, kind) {
            (CategoryFilter::All, _) => true,
            (CategoryFilter::DocumentsAndVideos, Some(k)) => {
                matches!(k, ItemKind::Document | ItemKind::Video)
            }
            (CategoryFilter::Only(wanted), Some(k)) => wanted == k,
            (_, None) => false,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "empty" => Ok(CategoryFilter::All),
            "docs" | "documents-and-videos" | "docs-videos" => {
                Ok(CategoryFilter::DocumentsAndVideos)
            }
            other => ItemKind::from_str(other)
                .ok()
                .filter(|k| k.is_media())
                .map(CategoryFilter::Only)
                .ok_or_else(|| format!("unknown category `{other}`")),
        }
    }
}

/// Media payload attached to a source message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    pub content_id: String,
    pub send_handle: Option<String>,
    pub kind: ItemKind,
    pub display_name: Option<String>,
}

/// A message read from a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceItem {
    pub sequence: i64,
    pub media: Option<MediaRef>,
    pub caption: Option<String>,
    /// Multi-part group this message belongs to, if any.
    pub group_id: Option<String>,
}

/// One page of a source scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceWindow {
    pub items: Vec<SourceItem>,
    /// Highest sequence examined, with or without a message behind it.
    pub scanned_to: i64,
    /// The source is known to hold nothing past `scanned_to`.
    pub exhausted: bool,
}

/// Source to destination pair for live forwarding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRule {
    pub source: String,
    pub destination: String,
}

/// Clone run status flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
pub enum RunStatus {
    Idle,
    Running,
    CoolingDown,
}

/// Result of a bulk insert-if-absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchInsert {
    pub saved: u64,
    pub skipped: u64,
}

/// An item parked outside the catalog after repeated delivery failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredItem {
    pub item: CatalogItem,
    pub reason: String,
    pub deferred_at: String,
}
