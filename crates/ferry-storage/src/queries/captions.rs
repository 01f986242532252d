// SPDX-FileCopyrightText: 2026 Ferry Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single global caption template.

use ferry_core::FerryError;
use rusqlite::{OptionalExtension, params};

use crate::database::Database;

pub async fn set(db: &Database, template: &str) -> Result<(), FerryError> {
    let template = template.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO caption_template (id, template) VALUES (1, ?1)
                 ON CONFLICT(id) DO UPDATE SET template = excluded.template,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![template],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get(db: &Database) -> Result<Option<String>, FerryError> {
    db.connection()
        .call(|conn| {
            conn.query_row("SELECT template FROM caption_template WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Returns whether a template existed.
pub async fn clear(db: &Database) -> Result<bool, FerryError> {
    db.connection()
        .call(|conn| Ok(conn.execute("DELETE FROM caption_template", [])? > 0))
        .await
        .map_err(crate::database::map_tr_err)
}
