// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Block progress tracking and the validation-escalation ceiling.

use tracing::info;

use formflow_core::types::{ActionDescriptor, BlockStatus, Session, SessionStatus};

/// Record one failed attempt against a block. Hitting the ceiling marks the
/// block `NeedsReview` and escalates the whole session to `PendingReview`.
/// Attempts past the ceiling keep counting but do not re-trigger anything.
pub fn record_failure(session: &mut Session, block_id: &str, max_attempts: u32) {
    let progress = session.block_progress_mut(block_id);
    progress.attempts += 1;
    if progress.status == BlockStatus::Pending {
        progress.status = BlockStatus::InProgress;
    }
    if progress.attempts >= max_attempts && progress.status != BlockStatus::NeedsReview {
        progress.status = BlockStatus::NeedsReview;
        session.status = SessionStatus::PendingReview;
        info!(block_id, max_attempts, "attempt ceiling reached, escalating to review");
    }
    session.touch();
}

/// Mark a block finished. Clears the block cursor so resolution moves on.
pub fn mark_done(session: &mut Session, block_id: &str) {
    let progress = session.block_progress_mut(block_id);
    progress.status = BlockStatus::Done;
    if session.current_block_id.as_deref() == Some(block_id) {
        session.current_block_id = None;
    }
    session.touch();
}

/// Record a block's on-complete action and park the session until the caller
/// reports the external work finished.
pub fn set_pending_action(session: &mut Session, block_id: &str, action: ActionDescriptor) {
    let progress = session.block_progress_mut(block_id);
    progress.pending_action = Some(action);
    session.status = SessionStatus::AwaitingExternal;
    session.touch();
}

/// Attempts consumed so far on a block.
pub fn attempts(session: &Session, block_id: &str) -> u32 {
    session.block_progress(block_id).map_or(0, |p| p.attempts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_core::types::SessionKey;
    use serde_json::json;

    fn session() -> Session {
        let mut s = Session::new(SessionKey::new("u1", "intake"), None, "test");
        s.status = SessionStatus::InProgress;
        s
    }

    #[test]
    fn failures_below_ceiling_keep_session_in_progress() {
        let mut s = session();
        record_failure(&mut s, "b1", 3);
        record_failure(&mut s, "b1", 3);
        assert_eq!(attempts(&s, "b1"), 2);
        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.block_progress("b1").unwrap().status, BlockStatus::InProgress);
    }

    #[test]
    fn ceiling_escalates_block_and_session() {
        let mut s = session();
        for _ in 0..3 {
            record_failure(&mut s, "b1", 3);
        }
        assert_eq!(s.status, SessionStatus::PendingReview);
        assert_eq!(s.block_progress("b1").unwrap().status, BlockStatus::NeedsReview);
        // Counting continues past the ceiling without changing status again.
        record_failure(&mut s, "b1", 3);
        assert_eq!(attempts(&s, "b1"), 4);
        assert_eq!(s.block_progress("b1").unwrap().status, BlockStatus::NeedsReview);
    }

    #[test]
    fn attempts_are_tracked_per_block() {
        let mut s = session();
        record_failure(&mut s, "b1", 3);
        record_failure(&mut s, "b2", 3);
        assert_eq!(attempts(&s, "b1"), 1);
        assert_eq!(attempts(&s, "b2"), 1);
    }

    #[test]
    fn mark_done_clears_block_cursor() {
        let mut s = session();
        s.current_block_id = Some("b1".to_string());
        mark_done(&mut s, "b1");
        assert_eq!(s.block_progress("b1").unwrap().status, BlockStatus::Done);
        assert!(s.current_block_id.is_none());
    }

    #[test]
    fn pending_action_parks_the_session() {
        let mut s = session();
        let action = ActionDescriptor {
            name: "notify".to_string(),
            endpoint: Some("https://example.test/hook".to_string()),
            method: "POST".to_string(),
            payload: json!({"block": "b1"}),
        };
        set_pending_action(&mut s, "b1", action.clone());
        assert_eq!(s.status, SessionStatus::AwaitingExternal);
        assert_eq!(s.block_progress("b1").unwrap().pending_action, Some(action));
    }
}
