// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deferred items: catalog rows set aside after repeated delivery failures.

use ferry_core::{CatalogItem, DeferredItem, FerryError};
use rusqlite::params;

use crate::database::Database;
use crate::models::{CATALOG_COLUMNS, catalog_item_from_row};

/// Move an item from the catalog into the deferred table.
pub async fn defer(db: &Database, item: &CatalogItem, reason: &str) -> Result<(), FerryError> {
    let item = item.clone();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR REPLACE INTO deferred_items
                 (content_id, display_name, source_location, item_kind, source_sequence,
                  transport_identity, caption, send_handle, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    item.content_id,
                    item.display_name,
                    item.source_location,
                    item.kind.to_string(),
                    item.source_sequence,
                    item.identity.to_string(),
                    item.caption,
                    item.send_handle,
                    reason,
                ],
            )?;
            tx.execute(
                "DELETE FROM catalog_items
                 WHERE content_id = ?1 AND source_location = ?2 AND source_sequence = ?3",
                params![item.content_id, item.source_location, item.source_sequence],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count(db: &Database) -> Result<u64, FerryError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM deferred_items", [], |row| row.get(0))?;
            Ok(n.max(0) as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn fetch_all(db: &Database) -> Result<Vec<DeferredItem>, FerryError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATALOG_COLUMNS}, reason, deferred_at FROM deferred_items ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok(DeferredItem {
                    item: catalog_item_from_row(row)?,
                    reason: row.get(8)?,
                    deferred_at: row.get(9)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Put every deferred item back into the catalog. Returns how many moved.
///
/// Items whose content id is already back in the catalog are dropped from
/// the deferred table without a second copy.
pub async fn requeue_all(db: &Database) -> Result<u64, FerryError> {
    db.connection()
        .call(|conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                &format!(
                    "INSERT OR IGNORE INTO catalog_items ({CATALOG_COLUMNS})
                     SELECT {CATALOG_COLUMNS} FROM deferred_items ORDER BY rowid ASC"
                ),
                [],
            )?;
            tx.execute("DELETE FROM deferred_items", [])?;
            tx.commit()?;
            Ok(moved as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use ferry_core::{ItemKind, TransportIdentity};
    use tempfile::tempdir;

    use super::*;
    use crate::queries::catalog;

    fn item(content_id: &str, seq: i64) -> CatalogItem {
        CatalogItem {
            content_id: content_id.into(),
            send_handle: None,
            display_name: "clip.mp4".into(),
            source_location: "-1005".into(),
            kind: ItemKind::Video,
            source_sequence: seq,
            identity: TransportIdentity::Secondary,
            caption: None,
        }
    }

    #[tokio::test]
    async fn defer_then_requeue_round_trip() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        catalog::insert_many_if_absent(&db, &[item("a", 1), item("b", 2)])
            .await
            .unwrap();

        defer(&db, &item("a", 1), "throttled twice").await.unwrap();
        assert_eq!(catalog::count(&db).await.unwrap(), 1);
        assert_eq!(count(&db).await.unwrap(), 1);

        let parked = fetch_all(&db).await.unwrap();
        assert_eq!(parked[0].item, item("a", 1));
        assert_eq!(parked[0].reason, "throttled twice");

        assert_eq!(requeue_all(&db).await.unwrap(), 1);
        assert_eq!(count(&db).await.unwrap(), 0);
        assert_eq!(catalog::count(&db).await.unwrap(), 2);
        db.close().await.unwrap();
    }
}
