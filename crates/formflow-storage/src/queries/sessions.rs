// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session row operations. The session itself travels as a JSON document;
//! key, status, and deletion columns are kept alongside for filtering.

use chrono::{DateTime, Utc};
use rusqlite::params;

use formflow_core::error::FormflowError;
use formflow_core::types::{Session, SessionKey};

use crate::database::{map_tr_err, Database};

/// Fetch one session by key.
pub async fn get(db: &Database, key: &SessionKey) -> Result<Option<Session>, FormflowError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT doc FROM sessions WHERE user_id = ?1 AND form_code = ?2",
            )?;
            let result = stmt.query_row(params![key.user_id, key.form_code], |row| {
                row.get::<_, String>(0)
            });
            match result {
                Ok(doc) => Ok(Some(doc)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)?
        .map(|doc| {
            serde_json::from_str(&doc).map_err(|e| FormflowError::Storage {
                source: Box::new(e),
            })
        })
        .transpose()
}

/// Insert or replace the whole session row.
pub async fn upsert(db: &Database, session: &Session) -> Result<(), FormflowError> {
    let doc = serde_json::to_string(session).map_err(|e| FormflowError::Storage {
        source: Box::new(e),
    })?;
    let session = session.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sessions
                     (user_id, form_code, status, doc, delete_requested_at, delete_purge_at,
                      created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (user_id, form_code) DO UPDATE SET
                     status = excluded.status,
                     doc = excluded.doc,
                     delete_requested_at = excluded.delete_requested_at,
                     delete_purge_at = excluded.delete_purge_at,
                     updated_at = excluded.updated_at",
                params![
                    session.key.user_id,
                    session.key.form_code,
                    session.status.to_string(),
                    doc,
                    session.delete_requested_at.map(|t| t.to_rfc3339()),
                    session.delete_purge_at.map(|t| t.to_rfc3339()),
                    session.created_at.to_rfc3339(),
                    session.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Hard-delete sessions (and their events) whose purge date has passed.
/// Returns the number of purged sessions.
pub async fn purge_due(db: &Database, now: DateTime<Utc>) -> Result<usize, FormflowError> {
    let cutoff = now.to_rfc3339();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM events WHERE (user_id, form_code) IN
                     (SELECT user_id, form_code FROM sessions
                      WHERE delete_purge_at IS NOT NULL AND delete_purge_at <= ?1)",
                params![cutoff],
            )?;
            let purged = tx.execute(
                "DELETE FROM sessions
                 WHERE delete_purge_at IS NOT NULL AND delete_purge_at <= ?1",
                params![cutoff],
            )?;
            tx.commit()?;
            Ok(purged)
        })
        .await
        .map_err(map_tr_err)
}
