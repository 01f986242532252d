// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Destination ledger operations.
//!
//! A shard only ever moves units from `pending_count` to `delivered_count`,
//! so their sum stays fixed from plan creation until the plan is cleared.

use ferry_core::{CatalogItem, DestinationShard, FerryError};
use rusqlite::{OptionalExtension, params};

use crate::database::Database;
use crate::models::{SHARD_COLUMNS, shard_from_row};

const CREDIT: &str = "UPDATE destination_shards
    SET pending_count = pending_count - ?2,
        delivered_count = delivered_count + ?2,
        state = CASE WHEN pending_count - ?2 = 0 THEN 'complete' ELSE 'active' END
    WHERE destination_id = ?1 AND pending_count >= ?2";

/// Replace the whole plan atomically.
pub async fn replace_all(db: &Database, shards: &[DestinationShard]) -> Result<bool, FerryError> {
    let shards = shards.to_vec();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM destination_shards", [])?;
            for shard in &shards {
                tx.execute(
                    "INSERT INTO destination_shards
                     (destination_id, shard_index, pending_count, delivered_count, state)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        shard.destination_id,
                        shard.shard_index,
                        shard.pending_count as i64,
                        shard.delivered_count as i64,
                        shard.state.to_string(),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All shards in fill order.
pub async fn fetch_all(db: &Database) -> Result<Vec<DestinationShard>, FerryError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHARD_COLUMNS} FROM destination_shards ORDER BY shard_index ASC"
            ))?;
            let rows = stmt.query_map([], shard_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn fetch_by_index(
    db: &Database,
    shard_index: u32,
) -> Result<Option<DestinationShard>, FerryError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {SHARD_COLUMNS} FROM destination_shards WHERE shard_index = ?1"),
                params![shard_index],
                shard_from_row,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move `delta` units from pending to delivered.
///
/// Returns `false` when the shard is unknown or has fewer than `delta`
/// units pending; the row is left untouched in that case.
pub async fn increment(db: &Database, destination_id: &str, delta: u64) -> Result<bool, FerryError> {
    let destination_id = destination_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(CREDIT, params![destination_id, delta as i64])?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn clear_all(db: &Database) -> Result<bool, FerryError> {
    db.connection()
        .call(|conn| {
            conn.execute("DELETE FROM destination_shards", [])?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a delivered catalog row and credit its shard in one transaction.
///
/// Returns whether the shard was credited. A shard with nothing pending is
/// not credited, but the catalog row is still removed since the item was
/// delivered.
pub async fn record_delivery(
    db: &Database,
    item: &CatalogItem,
    destination_id: &str,
) -> Result<bool, FerryError> {
    let content_id = item.content_id.clone();
    let source_location = item.source_location.clone();
    let source_sequence = item.source_sequence;
    let destination_id = destination_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM catalog_items
                 WHERE content_id = ?1 AND source_location = ?2 AND source_sequence = ?3",
                params![content_id, source_location, source_sequence],
            )?;
            let credited = tx.execute(CREDIT, params![destination_id, 1i64])? > 0;
            tx.commit()?;
            Ok(credited)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use ferry_core::{ItemKind, ShardState, TransportIdentity};
    use tempfile::tempdir;

    use super::*;
    use crate::queries::catalog;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn plan() -> Vec<DestinationShard> {
        vec![
            DestinationShard::new("-100a", 1, 3),
            DestinationShard::new("-100b", 2, 2),
        ]
    }

    #[tokio::test]
    async fn replace_all_then_fetch_in_order() {
        let (db, _dir) = setup_db().await;
        let mut shards = plan();
        shards.reverse();
        assert!(replace_all(&db, &shards).await.unwrap());

        let fetched = fetch_all(&db).await.unwrap();
        assert_eq!(fetched, plan());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn replace_all_discards_previous_plan() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();
        replace_all(&db, &[DestinationShard::new("-100c", 1, 9)])
            .await
            .unwrap();
        let fetched = fetch_all(&db).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].destination_id, "-100c");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_replace_keeps_old_plan() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();
        let duplicate_index = vec![
            DestinationShard::new("-1", 1, 1),
            DestinationShard::new("-2", 1, 1),
        ];
        assert!(replace_all(&db, &duplicate_index).await.is_err());
        assert_eq!(fetch_all(&db).await.unwrap(), plan());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fetch_by_index_finds_shard() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();
        let shard = fetch_by_index(&db, 2).await.unwrap().unwrap();
        assert_eq!(shard.destination_id, "-100b");
        assert!(fetch_by_index(&db, 3).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn increment_conserves_and_tracks_state() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();

        assert!(increment(&db, "-100b", 1).await.unwrap());
        let shard = fetch_by_index(&db, 2).await.unwrap().unwrap();
        assert_eq!((shard.pending_count, shard.delivered_count), (1, 1));
        assert_eq!(shard.state, ShardState::Active);

        assert!(increment(&db, "-100b", 1).await.unwrap());
        let shard = fetch_by_index(&db, 2).await.unwrap().unwrap();
        assert_eq!((shard.pending_count, shard.delivered_count), (0, 2));
        assert_eq!(shard.state, ShardState::Complete);

        // Nothing left to move.
        assert!(!increment(&db, "-100b", 1).await.unwrap());
        assert!(!increment(&db, "-nope", 1).await.unwrap());
        assert_eq!(fetch_by_index(&db, 2).await.unwrap().unwrap().planned(), 2);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_delivery_is_atomic_pair() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();
        let item = CatalogItem {
            content_id: "f1".into(),
            send_handle: None,
            display_name: "f1.pdf".into(),
            source_location: "-1009".into(),
            kind: ItemKind::Document,
            source_sequence: 4,
            identity: TransportIdentity::Primary,
            caption: None,
        };
        catalog::insert_if_absent(&db, &item).await.unwrap();

        assert!(record_delivery(&db, &item, "-100a").await.unwrap());
        assert_eq!(catalog::count(&db).await.unwrap(), 0);
        let shard = fetch_by_index(&db, 1).await.unwrap().unwrap();
        assert_eq!((shard.pending_count, shard.delivered_count), (2, 1));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn clear_all_empties_ledger() {
        let (db, _dir) = setup_db().await;
        replace_all(&db, &plan()).await.unwrap();
        assert!(clear_all(&db).await.unwrap());
        assert!(fetch_all(&db).await.unwrap().is_empty());
        db.close().await.unwrap();
    }
}
