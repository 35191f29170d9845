// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementations of [`SessionStore`] and [`TemplateProvider`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use formflow_config::model::StorageConfig;
use formflow_core::error::FormflowError;
use formflow_core::traits::{SessionStore, TemplateProvider};
use formflow_core::types::{EventRecord, FormTemplate, Session, SessionKey};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for sessions, events, and templates.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules. One
/// instance serves the whole process; writes funnel through the single
/// background connection.
#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database at the configured path and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, FormflowError> {
        let db = Database::open(config).await?;
        Ok(Self { db })
    }

    /// In-memory store for tests.
    pub async fn open_in_memory() -> Result<Self, FormflowError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Seed or update a template version.
    pub async fn upsert_template(&self, template: &FormTemplate) -> Result<(), FormflowError> {
        queries::templates::upsert(&self.db, template).await
    }

    /// Hard-delete every session whose scheduled purge date has passed.
    /// Intended to run periodically from the host.
    pub async fn purge_expired(&self) -> Result<usize, FormflowError> {
        let purged = queries::sessions::purge_due(&self.db, Utc::now()).await?;
        if purged > 0 {
            info!(purged, "purged soft-deleted sessions");
        }
        Ok(purged)
    }

    pub async fn close(&self) -> Result<(), FormflowError> {
        self.db.close().await
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn get_or_create(
        &self,
        key: &SessionKey,
        user_name: Option<&str>,
        channel: &str,
    ) -> Result<Session, FormflowError> {
        if let Some(mut session) = queries::sessions::get(&self.db, key).await? {
            if session.user_name.is_none() && user_name.is_some() {
                session.user_name = user_name.map(str::to_string);
                queries::sessions::upsert(&self.db, &session).await?;
            }
            return Ok(session);
        }
        let session = Session::new(key.clone(), user_name.map(str::to_string), channel);
        queries::sessions::upsert(&self.db, &session).await?;
        debug!(%key, "session created");
        Ok(session)
    }

    async fn save(&self, session: &Session) -> Result<(), FormflowError> {
        queries::sessions::upsert(&self.db, session).await
    }

    async fn append_event(
        &self,
        key: &SessionKey,
        event: &EventRecord,
    ) -> Result<(), FormflowError> {
        queries::events::append(&self.db, key, event).await
    }

    async fn recent_events(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> Result<Vec<EventRecord>, FormflowError> {
        queries::events::recent(&self.db, key, limit).await
    }

    async fn has_inbound(
        &self,
        key: &SessionKey,
        message_id: &str,
    ) -> Result<bool, FormflowError> {
        queries::events::has_inbound(&self.db, key, message_id).await
    }

    async fn request_deletion(
        &self,
        key: &SessionKey,
        purge_at: DateTime<Utc>,
    ) -> Result<(), FormflowError> {
        if let Some(mut session) = queries::sessions::get(&self.db, key).await? {
            session.delete_requested_at = Some(Utc::now());
            session.delete_purge_at = Some(purge_at);
            session.touch();
            queries::sessions::upsert(&self.db, &session).await?;
            info!(%key, %purge_at, "deletion scheduled");
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateProvider for SqliteStore {
    async fn get_active_by_code(
        &self,
        code: &str,
    ) -> Result<Option<FormTemplate>, FormflowError> {
        queries::templates::get_active_by_code(&self.db, code).await
    }

    async fn list_active(&self) -> Result<Vec<FormTemplate>, FormflowError> {
        queries::templates::list_active(&self.db).await
    }
}
