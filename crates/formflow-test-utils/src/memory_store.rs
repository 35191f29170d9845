// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`SessionStore`] for engine tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use formflow_core::error::FormflowError;
use formflow_core::traits::SessionStore;
use formflow_core::types::{Direction, EventRecord, Session, SessionKey};

#[derive(Default)]
struct Inner {
    sessions: HashMap<SessionKey, Session>,
    events: HashMap<SessionKey, Vec<EventRecord>>,
}

/// HashMap-backed session store. Mirrors the durable store's contract:
/// `save` replaces the whole session, events are append-only.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct snapshot of a stored session, for assertions.
    pub fn session(&self, key: &SessionKey) -> Option<Session> {
        self.inner.lock().unwrap().sessions.get(key).cloned()
    }

    /// Every logged event for a key, oldest first.
    pub fn events(&self, key: &SessionKey) -> Vec<EventRecord> {
        self.inner
            .lock()
            .unwrap()
            .events
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Pre-seed a session, bypassing `get_or_create`.
    pub fn put(&self, session: Session) {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.key.clone(), session);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(
        &self,
        key: &SessionKey,
        user_name: Option<&str>,
        channel: &str,
    ) -> Result<Session, FormflowError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.sessions.entry(key.clone()).or_insert_with(|| {
            Session::new(key.clone(), user_name.map(str::to_string), channel)
        });
        if session.user_name.is_none() {
            session.user_name = user_name.map(str::to_string);
        }
        Ok(session.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), FormflowError> {
        self.inner
            .lock()
            .unwrap()
            .sessions
            .insert(session.key.clone(), session.clone());
        Ok(())
    }

    async fn append_event(
        &self,
        key: &SessionKey,
        event: &EventRecord,
    ) -> Result<(), FormflowError> {
        self.inner
            .lock()
            .unwrap()
            .events
            .entry(key.clone())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn recent_events(
        &self,
        key: &SessionKey,
        limit: usize,
    ) -> Result<Vec<EventRecord>, FormflowError> {
        let inner = self.inner.lock().unwrap();
        let events = inner.events.get(key).cloned().unwrap_or_default();
        let start = events.len().saturating_sub(limit);
        Ok(events[start..].to_vec())
    }

    async fn has_inbound(
        &self,
        key: &SessionKey,
        message_id: &str,
    ) -> Result<bool, FormflowError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.events.get(key).is_some_and(|events| {
            events.iter().any(|e| {
                e.direction == Direction::In && e.message_id.as_deref() == Some(message_id)
            })
        }))
    }

    async fn request_deletion(
        &self,
        key: &SessionKey,
        purge_at: DateTime<Utc>,
    ) -> Result<(), FormflowError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(session) = inner.sessions.get_mut(key) {
            session.delete_requested_at = Some(Utc::now());
            session.delete_purge_at = Some(purge_at);
        }
        Ok(())
    }
}
