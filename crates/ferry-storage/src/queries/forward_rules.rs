// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live forwarding pairs.

use ferry_core::{FerryError, ForwardRule};
use rusqlite::params;

use crate::database::Database;

/// Returns `false` if the pair already existed.
pub async fn add(db: &Database, rule: &ForwardRule) -> Result<bool, FerryError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "INSERT OR IGNORE INTO forward_rules (source_location, destination_id)
                 VALUES (?1, ?2)",
                params![rule.source, rule.destination],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn remove(db: &Database, rule: &ForwardRule) -> Result<bool, FerryError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            let n = conn.execute(
                "DELETE FROM forward_rules WHERE source_location = ?1 AND destination_id = ?2",
                params![rule.source, rule.destination],
            )?;
            Ok(n > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn list(db: &Database) -> Result<Vec<ForwardRule>, FerryError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT source_location, destination_id FROM forward_rules
                 ORDER BY source_location, created_at",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ForwardRule {
                    source: row.get(0)?,
                    destination: row.get(1)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn destinations_for(db: &Database, source: &str) -> Result<Vec<String>, FerryError> {
    let source = source.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT destination_id FROM forward_rules WHERE source_location = ?1
                 ORDER BY created_at",
            )?;
            let rows = stmt.query_map(params![source], |row| row.get(0))?;
            rows.collect::<Result<Vec<String>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
