// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait for persistence backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FormflowError;
use crate::types::{EventRecord, Session, SessionKey};

/// Persistence for sessions and their append-only event logs.
///
/// `save` must be atomic per session: the engine performs at most one durable
/// write sequence per processed message and relies on the store never exposing
/// a partially-updated session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The session for `key`, created in its initial state on first contact.
    ///
    /// On an existing session, refreshes `user_name`/`channel` when provided.
    async fn get_or_create(
        &self,
        key: &SessionKey,
        user_name: Option<&str>,
        channel: &str,
    ) -> Result<Session, FormflowError>;

    /// Durably writes the whole session state.
    async fn save(&self, session: &Session) -> Result<(), FormflowError>;

    /// Appends one event to the session's log.
    async fn append_event(
        &self,
        key: &SessionKey,
        event: &EventRecord,
    ) -> Result<(), FormflowError>;

    /// The most recent `limit` events, oldest first.
    async fn recent_events(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> Result<Vec<EventRecord>, FormflowError>;

    /// Whether an inbound event with this channel message id was already logged.
    async fn has_inbound(
        &self,
        key: &SessionKey,
        message_id: &str,
    ) -> Result<bool, FormflowError>;

    /// Soft delete: stamps the deletion request and scheduled purge date on the
    /// session and its event log without blocking further writes.
    async fn request_deletion(
        &self,
        key: &SessionKey,
        purge_at: DateTime<Utc>,
    ) -> Result<(), FormflowError>;
}
