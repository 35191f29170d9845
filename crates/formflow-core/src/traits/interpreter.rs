// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer interpreter trait: the AI collaborator consulted on option mismatches.

use async_trait::async_trait;

use crate::error::FormflowError;
use crate::types::{CoercedOption, Question};

/// Attempts a semantic match of free text against a question's option set.
///
/// Consulted only after structural validation fails on a choice question.
/// Implementations must be bounded-latency; the engine additionally wraps
/// calls in a timeout and treats any failure as "no match". Returning a value
/// that is not in the option set is treated as no match as well: the fallback
/// never fabricates an answer.
#[async_trait]
pub trait AnswerInterpreter: Send + Sync {
    async fn coerce_option(
        &self,
        question: &Question,
        raw: &str,
    ) -> Result<Option<CoercedOption>, FormflowError>;
}
