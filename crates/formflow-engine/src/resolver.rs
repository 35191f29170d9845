// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure current-question resolution.
//!
//! Given a template and the session state, determines which question the user
//! should answer next. Resolution honours the session cursor when it still
//! points at a visible, unanswered question, and otherwise scans blocks in
//! declaration order for the first pending question. No I/O happens here.

use formflow_core::types::{Block, FormTemplate, Question, Session};

/// Outcome of a resolution pass.
///
/// `question` is `None` when every visible question is answered, which the
/// engine treats as template completion.
#[derive(Debug)]
pub struct Resolution<'a> {
    pub question: Option<&'a Question>,
    pub block: Option<Block>,
}

impl Resolution<'_> {
    pub fn is_complete(&self) -> bool {
        self.question.is_none()
    }
}

/// Resolve the question the session should present next.
///
/// The stored cursor wins while it is still actionable, so a user who
/// triggered pagination or re-prompting stays on the same question. A cursor
/// pointing at an answered or hidden question is ignored and resolution falls
/// through to the block scan.
pub fn resolve_current<'a>(template: &'a FormTemplate, session: &Session) -> Resolution<'a> {
    if let Some(cursor) = session.current_qid.as_deref() {
        if let Some(question) = template.question(cursor) {
            if !is_answered(session, &question.qid) && is_visible(question, session) {
                return Resolution {
                    block: block_of(template, question),
                    question: Some(question),
                };
            }
        }
    }

    for block in template.build_blocks() {
        if let Some(question) = first_pending_in_block(template, session, &block.id) {
            return Resolution {
                question: Some(question),
                block: Some(block),
            };
        }
    }

    Resolution {
        question: None,
        block: None,
    }
}

/// Whether a question is visible given answers recorded so far.
///
/// Questions without a condition are always visible. Conditional questions
/// compare the referenced answer against the expected value with
/// numeric-aware equality. A missing answer hides the question.
pub fn is_visible(question: &Question, session: &Session) -> bool {
    let Some(condition) = &question.show_if else {
        return true;
    };
    match session.answer(&condition.qid).and_then(|a| a.value.as_deref()) {
        Some(actual) => formflow_core::types::values_equal(actual, &condition.equals),
        None => false,
    }
}

/// An answer record counts as answered even when its value is `None`, which
/// happens for evidence-only submissions.
pub fn is_answered(session: &Session, qid: &str) -> bool {
    session.answer(qid).is_some()
}

fn first_pending_in_block<'a>(
    template: &'a FormTemplate,
    session: &Session,
    block_id: &str,
) -> Option<&'a Question> {
    template
        .questions
        .iter()
        .find(|q| q.block_id == block_id && !is_answered(session, &q.qid) && is_visible(q, session))
}

fn block_of(template: &FormTemplate, question: &Question) -> Option<Block> {
    template
        .build_blocks()
        .into_iter()
        .find(|b| b.id == question.block_id)
}
