// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message transport trait: the send, copy, and fetch primitives of a remote
//! messaging service.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ItemKind, SourceItem, SourceWindow, TransportIdentity};

/// A sender bound to one identity on the remote service.
///
/// Implementations do their own low-level network retries; every error that
/// reaches the caller is already classified as a [`TransportError`].
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Which identity this transport sends as.
    fn identity(&self) -> TransportIdentity;

    /// Re-send a payload from its cached content handle.
    async fn send_cached(
        &self,
        destination: &str,
        content_id: &str,
        kind: ItemKind,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Copy a source message by reference into `destination`.
    async fn copy_item(
        &self,
        destination: &str,
        source: &str,
        sequence: i64,
        caption: Option<&str>,
    ) -> Result<(), TransportError>;

    /// Copy several messages of one source in a single call, keeping albums
    /// together where the service supports it.
    async fn copy_items(
        &self,
        destination: &str,
        source: &str,
        sequences: &[i64],
    ) -> Result<(), TransportError> {
        for &sequence in sequences {
            self.copy_item(destination, source, sequence, None).await?;
        }
        Ok(())
    }

    /// Read one message from a source. `Ok(None)` means it no longer exists.
    async fn fetch_item(
        &self,
        source: &str,
        sequence: i64,
    ) -> Result<Option<SourceItem>, TransportError>;

    /// Examine sequences `offset + 1 ..= offset + limit`.
    ///
    /// Deleted messages leave holes, so an empty window is not the end of
    /// the source; only [`SourceWindow::exhausted`] is. A window cut short by
    /// throttling reports how far it got in `scanned_to`.
    async fn fetch_window(
        &self,
        source: &str,
        offset: i64,
        limit: usize,
    ) -> Result<SourceWindow, TransportError>;

    /// Whether this identity can read `source`.
    async fn can_read(&self, source: &str) -> bool;
}
