// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only event log operations.

use rusqlite::params;

use formflow_core::error::FormflowError;
use formflow_core::types::{EventRecord, SessionKey};

use crate::database::{map_tr_err, Database};

/// Append one event to a session's log.
pub async fn append(
    db: &Database,
    key: &SessionKey,
    event: &EventRecord,
) -> Result<(), FormflowError> {
    let doc = serde_json::to_string(event).map_err(|e| FormflowError::Storage {
        source: Box::new(e),
    })?;
    let key = key.clone();
    let direction = event.direction.to_string();
    let message_id = event.message_id.clone();
    let ts = event.ts.to_rfc3339();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO events (user_id, form_code, direction, message_id, doc, ts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![key.user_id, key.form_code, direction, message_id, doc, ts],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent `limit` events, oldest first.
pub async fn recent(
    db: &Database,
    key: &SessionKey,
    limit: usize,
) -> Result<Vec<EventRecord>, FormflowError> {
    let key = key.clone();
    let docs: Vec<String> = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc FROM events
                 WHERE user_id = ?1 AND form_code = ?2
                 ORDER BY id DESC LIMIT ?3",
            )?;
            let rows = stmt.query_map(
                params![key.user_id, key.form_code, limit as i64],
                |row| row.get::<_, String>(0),
            )?;
            let mut docs = Vec::new();
            for row in rows {
                docs.push(row?);
            }
            Ok(docs)
        })
        .await
        .map_err(map_tr_err)?;

    let mut events = Vec::with_capacity(docs.len());
    // Query returned newest first.
    for doc in docs.into_iter().rev() {
        events.push(serde_json::from_str(&doc).map_err(|e| FormflowError::Storage {
            source: Box::new(e),
        })?);
    }
    Ok(events)
}

/// Whether an inbound event with this message id was already logged.
pub async fn has_inbound(
    db: &Database,
    key: &SessionKey,
    message_id: &str,
) -> Result<bool, FormflowError> {
    let key = key.clone();
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT count(*) FROM events
                 WHERE user_id = ?1 AND form_code = ?2
                   AND direction = 'IN' AND message_id = ?3",
                params![key.user_id, key.form_code, message_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}
