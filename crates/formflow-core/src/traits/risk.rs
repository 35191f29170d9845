// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Risk evaluator trait: optional gate on structurally valid answers.

use async_trait::async_trait;

use crate::error::FormflowError;
use crate::types::{Answer, Question, RiskVerdict, Session};

/// Assesses a validated answer for conditions requiring human review.
///
/// Only invoked for questions flagged with `risk_check`. A failing verdict is
/// a hard escalation: the session moves to pending review and the answer is
/// not saved, regardless of structural validity.
#[async_trait]
pub trait RiskEvaluator: Send + Sync {
    async fn evaluate(
        &self,
        session: &Session,
        question: &Question,
        answer: &Answer,
    ) -> Result<RiskVerdict, FormflowError>;
}
