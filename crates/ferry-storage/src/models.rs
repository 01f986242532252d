// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between SQLite and the core types.

use std::str::FromStr;

use ferry_core::{CatalogItem, DestinationShard};
use rusqlite::Row;
use rusqlite::types::Type;

/// Columns selected for a catalog row, in [`catalog_item_from_row`] order.
pub(crate) const CATALOG_COLUMNS: &str = "content_id, display_name, source_location, item_kind, \
     source_sequence, transport_identity, caption, send_handle";

/// Columns selected for a shard row, in [`shard_from_row`] order.
pub(crate) const SHARD_COLUMNS: &str =
    "destination_id, shard_index, pending_count, delivered_count, state";

/// Parse a text column into a strum-backed enum.
pub(crate) fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    T::from_str(&raw).map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn catalog_item_from_row(row: &Row<'_>) -> rusqlite::Result<CatalogItem> {
    Ok(CatalogItem {
        content_id: row.get(0)?,
        send_handle: row.get(7)?,
        display_name: row.get(1)?,
        source_location: row.get(2)?,
        kind: parse_column(row, 3)?,
        source_sequence: row.get(4)?,
        identity: parse_column(row, 5)?,
        caption: row.get(6)?,
    })
}

pub(crate) fn shard_from_row(row: &Row<'_>) -> rusqlite::Result<DestinationShard> {
    let pending: i64 = row.get(2)?;
    let delivered: i64 = row.get(3)?;
    Ok(DestinationShard {
        destination_id: row.get(0)?,
        shard_index: row.get(1)?,
        pending_count: pending.max(0) as u64,
        delivered_count: delivered.max(0) as u64,
        state: parse_column(row, 4)?,
    })
}

/// Catalog items must carry a content id, a source, and a positive sequence.
pub(crate) fn is_valid_item(item: &CatalogItem) -> bool {
    !item.content_id.trim().is_empty()
        && !item.source_location.trim().is_empty()
        && item.source_sequence > 0
}

#[cfg(test)]
mod tests {
    use ferry_core::{ItemKind, TransportIdentity};

    use super::*;

    fn item(content_id: &str, source: &str, seq: i64) -> CatalogItem {
        CatalogItem {
            content_id: content_id.into(),
            send_handle: None,
            display_name: "x".into(),
            source_location: source.into(),
            kind: ItemKind::Video,
            source_sequence: seq,
            identity: TransportIdentity::Primary,
            caption: None,
        }
    }

    #[test]
    fn validation_rules() {
        assert!(is_valid_item(&item("a", "-100", 1)));
        assert!(!is_valid_item(&item("", "-100", 1)));
        assert!(!is_valid_item(&item("a", " ", 1)));
        assert!(!is_valid_item(&item("a", "-100", 0)));
    }
}
