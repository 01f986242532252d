// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Catalog operations: the table of work remaining.

use ferry_core::{BatchInsert, CatalogItem, FerryError};
use rusqlite::{Transaction, params};
use tracing::warn;

use crate::database::Database;
use crate::models::{CATALOG_COLUMNS, catalog_item_from_row, is_valid_item};

const INSERT_OR_IGNORE: &str = "INSERT OR IGNORE INTO catalog_items
    (content_id, display_name, source_location, item_kind, source_sequence, transport_identity, caption,
     send_handle)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";

pub(crate) fn insert_row(tx: &Transaction<'_>, item: &CatalogItem) -> rusqlite::Result<usize> {
    tx.execute(
        INSERT_OR_IGNORE,
        params![
            item.content_id,
            item.display_name,
            item.source_location,
            item.kind.to_string(),
            item.source_sequence,
            item.identity.to_string(),
            item.caption,
            item.send_handle,
        ],
    )
}

fn count_rows(conn: &rusqlite::Connection) -> rusqlite::Result<u64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_items", [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

/// Insert one item unless its content id already exists.
///
/// Invalid items are rejected without touching the table.
pub async fn insert_if_absent(db: &Database, item: &CatalogItem) -> Result<bool, FerryError> {
    if !is_valid_item(item) {
        warn!(content_id = %item.content_id, "rejecting invalid catalog item");
        return Ok(false);
    }
    let item = item.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let inserted = insert_row(&tx, &item)?;
            tx.commit()?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert a batch in one transaction.
///
/// `saved` is the growth of the table; everything else (duplicates and
/// invalid items) counts as skipped.
pub async fn insert_many_if_absent(
    db: &Database,
    items: &[CatalogItem],
) -> Result<BatchInsert, FerryError> {
    let total = items.len() as u64;
    let valid: Vec<CatalogItem> = items.iter().filter(|i| is_valid_item(i)).cloned().collect();
    let rejected = total - valid.len() as u64;
    if rejected > 0 {
        warn!(rejected, "rejecting invalid catalog items");
    }

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let before = count_rows(&tx)?;
            for item in &valid {
                insert_row(&tx, item)?;
            }
            let after = count_rows(&tx)?;
            tx.commit()?;
            let saved = after - before;
            Ok(BatchInsert {
                saved,
                skipped: total - saved,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn count(db: &Database) -> Result<u64, FerryError> {
    db.connection()
        .call(|conn| count_rows(conn))
        .await
        .map_err(crate::database::map_tr_err)
}

/// Every remaining item, oldest first.
pub async fn fetch_all(db: &Database) -> Result<Vec<CatalogItem>, FerryError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATALOG_COLUMNS} FROM catalog_items ORDER BY rowid ASC"
            ))?;
            let rows = stmt.query_map([], catalog_item_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The oldest `limit` items. Delivered rows are deleted, so repeated calls
/// walk the catalog forward.
pub async fn fetch_page(db: &Database, limit: usize) -> Result<Vec<CatalogItem>, FerryError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CATALOG_COLUMNS} FROM catalog_items ORDER BY rowid ASC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], catalog_item_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete one item by its full key. Returns whether a row was removed.
pub async fn delete(
    db: &Database,
    content_id: &str,
    source_location: &str,
    source_sequence: i64,
) -> Result<bool, FerryError> {
    let content_id = content_id.to_string();
    let source_location = source_location.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM catalog_items
                 WHERE content_id = ?1 AND source_location = ?2 AND source_sequence = ?3",
                params![content_id, source_location, source_sequence],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove every catalog row.
pub async fn delete_all(db: &Database) -> Result<bool, FerryError> {
    db.connection()
        .call(|conn| {
            conn.execute("DELETE FROM catalog_items", [])?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use ferry_core::{ItemKind, TransportIdentity};
    use tempfile::tempdir;

    use super::*;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn item(content_id: &str, seq: i64) -> CatalogItem {
        CatalogItem {
            content_id: content_id.into(),
            send_handle: None,
            display_name: format!("{content_id}.mkv"),
            source_location: "-1001".into(),
            kind: ItemKind::Video,
            source_sequence: seq,
            identity: TransportIdentity::Primary,
            caption: Some("cap".into()),
        }
    }

    #[tokio::test]
    async fn insert_if_absent_is_idempotent() {
        let (db, _dir) = setup_db().await;
        assert!(insert_if_absent(&db, &item("a", 1)).await.unwrap());
        assert!(!insert_if_absent(&db, &item("a", 1)).await.unwrap());
        assert_eq!(count(&db).await.unwrap(), 1);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn bulk_insert_counts_by_delta() {
        let (db, _dir) = setup_db().await;
        insert_if_absent(&db, &item("a", 1)).await.unwrap();

        let batch = vec![item("a", 1), item("b", 2), item("c", 3), item("b", 2)];
        let result = insert_many_if_absent(&db, &batch).await.unwrap();
        assert_eq!(result, BatchInsert { saved: 2, skipped: 2 });
        assert_eq!(count(&db).await.unwrap(), 3);

        let again = insert_many_if_absent(&db, &batch).await.unwrap();
        assert_eq!(again, BatchInsert { saved: 0, skipped: 4 });
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn send_handle_survives_storage_and_keys_stay_unique() {
        let (db, _dir) = setup_db().await;
        let first = CatalogItem {
            send_handle: Some("BAAC-first".into()),
            ..item("u-clip", 1)
        };
        let repost = CatalogItem {
            send_handle: Some("BAAC-second".into()),
            ..item("u-clip", 2)
        };
        assert!(insert_if_absent(&db, &first).await.unwrap());
        assert!(!insert_if_absent(&db, &repost).await.unwrap());

        let stored = fetch_all(&db).await.unwrap();
        assert_eq!(stored, vec![first]);
        assert_eq!(stored[0].handle(), "BAAC-first");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_items_count_as_skipped() {
        let (db, _dir) = setup_db().await;
        let batch = vec![item("", 1), item("ok", 0), item("good", 5)];
        let result = insert_many_if_absent(&db, &batch).await.unwrap();
        assert_eq!(result, BatchInsert { saved: 1, skipped: 2 });
        assert!(!insert_if_absent(&db, &item("", 9)).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_all_preserves_discovery_order() {
        let (db, _dir) = setup_db().await;
        insert_many_if_absent(&db, &[item("z", 3), item("a", 1), item("m", 2)])
            .await
            .unwrap();
        let ids: Vec<String> = fetch_all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.content_id)
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_page_returns_oldest_first() {
        let (db, _dir) = setup_db().await;
        insert_many_if_absent(&db, &[item("a", 1), item("b", 2), item("c", 3)])
            .await
            .unwrap();
        let page = fetch_page(&db, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content_id, "a");

        delete(&db, "a", "-1001", 1).await.unwrap();
        let next = fetch_page(&db, 2).await.unwrap();
        assert_eq!(next[0].content_id, "b");
        assert_eq!(next[1].content_id, "c");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetched_rows_round_trip_fields() {
        let (db, _dir) = setup_db().await;
        let mut original = item("doc", 7);
        original.kind = ItemKind::Document;
        original.identity = TransportIdentity::Secondary;
        original.caption = None;
        insert_if_absent(&db, &original).await.unwrap();
        assert_eq!(fetch_all(&db).await.unwrap(), vec![original]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_requires_full_key() {
        let (db, _dir) = setup_db().await;
        insert_if_absent(&db, &item("a", 1)).await.unwrap();
        assert!(!delete(&db, "a", "-1001", 2).await.unwrap());
        assert!(!delete(&db, "a", "-999", 1).await.unwrap());
        assert!(delete(&db, "a", "-1001", 1).await.unwrap());
        assert_eq!(count(&db).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_all_empties_catalog() {
        let (db, _dir) = setup_db().await;
        insert_many_if_absent(&db, &[item("a", 1), item("b", 2)])
            .await
            .unwrap();
        assert!(delete_all(&db).await.unwrap());
        assert_eq!(count(&db).await.unwrap(), 0);
        db.close().await.unwrap();
    }
}
