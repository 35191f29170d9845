// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Evidence validator trait for attachment checks.

use async_trait::async_trait;

use crate::error::FormflowError;
use crate::types::{Evidence, EvidenceVerdict, Question, Session};

/// Checks an answer's attachments for questions that require evidence.
///
/// Failures are recoverable (counted as a block attempt) until the attempt
/// ceiling escalates the session. Implementation errors degrade to a failing
/// verdict rather than aborting the turn.
#[async_trait]
pub trait EvidenceValidator: Send + Sync {
    async fn validate(
        &self,
        question: &Question,
        evidence: &[Evidence],
        session: &Session,
    ) -> Result<EvidenceVerdict, FormflowError>;
}
