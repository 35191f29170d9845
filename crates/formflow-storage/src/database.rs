// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use tokio_rusqlite::Connection;
use tracing::debug;

use formflow_config::model::StorageConfig;
use formflow_core::error::FormflowError;

use crate::migrations;

/// Handle to the single SQLite connection.
///
/// Clone-cheap: the inner connection is a channel to the background thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at the configured path, apply
    /// PRAGMAs, and run pending migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, FormflowError> {
        let conn = Connection::open(&config.database_path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;
        let wal = config.wal_mode;
        conn.call(move |conn| {
            if wal {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        let db = Self { conn };
        db.conn
            .call(|conn| {
                migrations::run_migrations(conn)?;
                Ok(())
            })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(e) => e,
                other => FormflowError::Storage {
                    source: Box::new(other),
                },
            })?;
        debug!(path = %config.database_path, "database opened");
        Ok(db)
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> Result<Self, FormflowError> {
        let config = StorageConfig {
            database_path: ":memory:".to_string(),
            wal_mode: false,
        };
        Self::open(&config).await
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), FormflowError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> FormflowError {
    FormflowError::Storage {
        source: Box::new(e),
    }
}
