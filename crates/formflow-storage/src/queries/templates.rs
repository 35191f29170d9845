// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template row operations. A template is immutable per (code, version);
//! lookups return the highest active version.

use chrono::Utc;
use rusqlite::params;

use formflow_core::error::FormflowError;
use formflow_core::types::FormTemplate;

use crate::database::{map_tr_err, Database};

/// Store one template version. Replaces a row with the same (code, version),
/// which is how a version gets activated or deactivated.
pub async fn upsert(db: &Database, template: &FormTemplate) -> Result<(), FormflowError> {
    let doc = serde_json::to_string(template).map_err(|e| FormflowError::Storage {
        source: Box::new(e),
    })?;
    let code = template.code.clone();
    let version = template.version;
    let is_active = template.is_active;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO templates (code, version, is_active, doc, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (code, version) DO UPDATE SET
                     is_active = excluded.is_active,
                     doc = excluded.doc",
                params![code, version, is_active, doc, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The highest active version for a code, if any.
pub async fn get_active_by_code(
    db: &Database,
    code: &str,
) -> Result<Option<FormTemplate>, FormflowError> {
    let code = code.to_string();
    let doc: Option<String> = db
        .connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT doc FROM templates
                 WHERE code = ?1 AND is_active = 1
                 ORDER BY version DESC LIMIT 1",
                params![code],
                |row| row.get(0),
            );
            match result {
                Ok(doc) => Ok(Some(doc)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)?;
    doc.map(|doc| {
        serde_json::from_str(&doc).map_err(|e| FormflowError::Storage {
            source: Box::new(e),
        })
    })
    .transpose()
}

/// The highest active version of every code.
pub async fn list_active(db: &Database) -> Result<Vec<FormTemplate>, FormflowError> {
    let docs: Vec<String> = db
        .connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT doc FROM templates t
                 WHERE is_active = 1
                   AND version = (SELECT max(version) FROM templates
                                  WHERE code = t.code AND is_active = 1)
                 ORDER BY code",
            )?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut docs = Vec::new();
            for row in rows {
                docs.push(row?);
            }
            Ok(docs)
        })
        .await
        .map_err(map_tr_err)?;

    let mut templates = Vec::with_capacity(docs.len());
    for doc in docs {
        templates.push(serde_json::from_str(&doc).map_err(|e| FormflowError::Storage {
            source: Box::new(e),
        })?);
    }
    Ok(templates)
}
