// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session status transitions.
//!
//! Every status change in the engine goes through one of these functions, so
//! the legal transition set stays in a single reviewable place. The functions
//! are infallible; callers decide which transition an event maps to.

use formflow_core::types::{Session, SessionStatus};

/// Consent given: start (or resume) the question flow.
pub fn consent_accepted(session: &mut Session) {
    session.status = SessionStatus::InProgress;
    session.consent_prompted = false;
    session.touch();
}

/// Consent refused: terminal until an explicit restart.
pub fn consent_declined(session: &mut Session) {
    session.status = SessionStatus::Cancelled;
    session.consent_prompted = false;
    session.touch();
}

/// Full wipe back to the consent gate.
pub fn restart(session: &mut Session) {
    session.restart();
}

/// Undo the most recent answer and keep collecting.
pub fn back_one(session: &mut Session) -> bool {
    let popped = session.pop_last_answer().is_some();
    if popped {
        session.status = SessionStatus::InProgress;
    }
    popped
}

/// Resume collecting after an external action or a pause.
pub fn resume(session: &mut Session) {
    session.status = SessionStatus::InProgress;
    session.touch();
}

/// Park the session at the user's request.
pub fn pause(session: &mut Session) {
    session.status = SessionStatus::AwaitingExternal;
    session.touch();
}

/// Explicit human-takeover request.
pub fn handoff(session: &mut Session) {
    session.status = SessionStatus::Handoff;
    session.touch();
}

/// User-initiated or risk-initiated escalation to human review.
pub fn escalate_review(session: &mut Session) {
    session.status = SessionStatus::PendingReview;
    session.touch();
}

/// Every visible question answered.
pub fn complete(session: &mut Session) {
    session.status = SessionStatus::Completed;
    session.current_qid = None;
    session.current_block_id = None;
    session.touch();
}

/// User opted out of the form into free chat. The consent gate is re-armed so
/// returning to the form goes through consent again.
pub fn enter_free_chat(session: &mut Session) {
    session.notes.free_chat = true;
    session.status = SessionStatus::AwaitingConsent;
    session.current_qid = None;
    session.current_block_id = None;
    session.touch();
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_core::types::{Answer, SessionKey};

    fn session(status: SessionStatus) -> Session {
        let mut s = Session::new(SessionKey::new("u1", "intake"), None, "test");
        s.status = status;
        s
    }

    #[test]
    fn transition_table() {
        let cases: Vec<(SessionStatus, fn(&mut Session), SessionStatus)> = vec![
            (SessionStatus::AwaitingConsent, consent_accepted, SessionStatus::InProgress),
            (SessionStatus::AwaitingConsent, consent_declined, SessionStatus::Cancelled),
            (SessionStatus::InProgress, pause, SessionStatus::AwaitingExternal),
            (SessionStatus::AwaitingExternal, resume, SessionStatus::InProgress),
            (SessionStatus::InProgress, handoff, SessionStatus::Handoff),
            (SessionStatus::InProgress, escalate_review, SessionStatus::PendingReview),
            (SessionStatus::InProgress, complete, SessionStatus::Completed),
            (SessionStatus::Completed, restart, SessionStatus::AwaitingConsent),
            (SessionStatus::InProgress, enter_free_chat, SessionStatus::AwaitingConsent),
        ];
        for (from, transition, to) in cases {
            let mut s = session(from);
            transition(&mut s);
            assert_eq!(s.status, to, "{from} -> {to}");
        }
    }

    #[test]
    fn restart_wipes_answers_and_progress() {
        let mut s = session(SessionStatus::InProgress);
        s.upsert_answer(Answer::new("q1", Some("x".to_string())));
        s.block_progress_mut("b1").attempts = 2;
        s.current_qid = Some("q2".to_string());
        restart(&mut s);
        assert_eq!(s.status, SessionStatus::AwaitingConsent);
        assert!(s.answers.is_empty());
        assert!(s.block_statuses.is_empty());
        assert!(s.current_qid.is_none());
    }

    #[test]
    fn back_one_pops_and_resumes() {
        let mut s = session(SessionStatus::PendingReview);
        s.upsert_answer(Answer::new("q1", Some("x".to_string())));
        assert!(back_one(&mut s));
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.answers.is_empty());
    }

    #[test]
    fn back_one_with_no_answers_is_a_noop() {
        let mut s = session(SessionStatus::InProgress);
        assert!(!back_one(&mut s));
    }

    #[test]
    fn complete_clears_cursor() {
        let mut s = session(SessionStatus::InProgress);
        s.current_qid = Some("q9".to_string());
        s.current_block_id = Some("b1".to_string());
        complete(&mut s);
        assert!(s.current_qid.is_none());
        assert!(s.current_block_id.is_none());
    }
}
