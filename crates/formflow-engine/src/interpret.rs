// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-text coercion for choice questions.
//!
//! Runs after deterministic validation rejects a choice input. A lenient
//! substring pass handles near-misses locally; anything still unmatched goes
//! to the pluggable [`AnswerInterpreter`], whose output is only trusted when
//! it names a real option. Interpreter errors and timeouts degrade to
//! "no match" so the turn falls back to the validation re-prompt.

use std::time::Duration;

use tracing::warn;

use formflow_core::traits::AnswerInterpreter;
use formflow_core::types::{CoercedOption, Question};

use crate::command::fold;

/// Lenient deterministic pass, ignoring case and diacritics throughout.
/// Exact folded equality against a label or value matches regardless of
/// length. Containment both ways needs at least three characters of input
/// to avoid matching everything, and only unambiguous hits count.
pub fn lenient_match(question: &Question, text: &str) -> Option<CoercedOption> {
    let needle = fold(text.trim());
    if needle.is_empty() {
        return None;
    }
    if let Some(opt) = question
        .options
        .iter()
        .find(|o| fold(&o.label) == needle || fold(&o.value) == needle)
    {
        return Some(CoercedOption {
            value: opt.value.clone(),
            label: opt.label.clone(),
        });
    }
    if needle.chars().count() < 3 {
        return None;
    }
    let mut hits = question.options.iter().filter(|o| {
        let label = fold(&o.label);
        let value = fold(&o.value);
        label.contains(&needle)
            || needle.contains(&label)
            || value.contains(&needle)
            || needle.contains(&value)
    });
    let first = hits.next()?;
    if hits.next().is_some() {
        return None;
    }
    Some(CoercedOption {
        value: first.value.clone(),
        label: first.label.clone(),
    })
}

/// Full coercion pipeline: lenient pass, then the interpreter under a
/// timeout. The interpreter result must correspond to one of the question's
/// options (by value or case-insensitive label) or it is discarded.
pub async fn coerce_option(
    interpreter: Option<&dyn AnswerInterpreter>,
    question: &Question,
    text: &str,
    timeout: Duration,
) -> Option<CoercedOption> {
    if let Some(found) = lenient_match(question, text) {
        return Some(found);
    }
    let interpreter = interpreter?;

    let outcome = tokio::time::timeout(timeout, interpreter.coerce_option(question, text)).await;
    let candidate = match outcome {
        Ok(Ok(candidate)) => candidate?,
        Ok(Err(err)) => {
            warn!(qid = %question.qid, error = %err, "answer interpreter failed, treating as no match");
            return None;
        }
        Err(_) => {
            warn!(qid = %question.qid, ?timeout, "answer interpreter timed out, treating as no match");
            return None;
        }
    };

    anchor_to_options(question, &candidate)
}

/// Re-anchor an interpreter suggestion to the actual option list. Protects
/// against hallucinated values.
fn anchor_to_options(question: &Question, candidate: &CoercedOption) -> Option<CoercedOption> {
    let label_lowered = candidate.label.to_lowercase();
    question
        .options
        .iter()
        .find(|o| o.value == candidate.value || o.label.to_lowercase() == label_lowered)
        .map(|o| CoercedOption {
            value: o.value.clone(),
            label: o.label.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use formflow_core::error::FormflowError;
    use formflow_core::types::{ChoiceOption, QuestionType};

    fn question() -> Question {
        let mut q = Question::new("city", "Which city?", QuestionType::Dropdown);
        q.options = vec![
            ChoiceOption::new("Santiago", "scl"),
            ChoiceOption::new("Valparaiso", "vap"),
        ];
        q
    }

    struct FixedInterpreter(Option<CoercedOption>);

    #[async_trait]
    impl AnswerInterpreter for FixedInterpreter {
        async fn coerce_option(
            &self,
            _question: &Question,
            _raw: &str,
        ) -> Result<Option<CoercedOption>, FormflowError> {
            Ok(self.0.clone())
        }
    }

    struct FailingInterpreter;

    #[async_trait]
    impl AnswerInterpreter for FailingInterpreter {
        async fn coerce_option(
            &self,
            _question: &Question,
            _raw: &str,
        ) -> Result<Option<CoercedOption>, FormflowError> {
            Err(FormflowError::Interpreter {
                message: "upstream unavailable".to_string(),
                source: None,
            })
        }
    }

    #[test]
    fn lenient_match_handles_partial_input() {
        let q = question();
        assert_eq!(lenient_match(&q, "santia").unwrap().value, "scl");
        assert_eq!(lenient_match(&q, "I live in Valparaiso!").unwrap().value, "vap");
        // Accented input still hits the plain label.
        assert_eq!(lenient_match(&q, "Valparaíso").unwrap().value, "vap");
    }

    #[test]
    fn short_exact_input_matches_accented_label() {
        let mut q = Question::new("consent", "Agree?", QuestionType::Dropdown);
        q.options = vec![
            ChoiceOption::new("Sí", "yes"),
            ChoiceOption::new("No", "no"),
        ];
        assert_eq!(lenient_match(&q, "si").unwrap().value, "yes");
        assert_eq!(lenient_match(&q, "SI").unwrap().value, "yes");
        assert_eq!(lenient_match(&q, "no").unwrap().value, "no");
        assert!(lenient_match(&q, "s").is_none());
    }

    #[test]
    fn lenient_match_rejects_short_or_ambiguous_input() {
        let mut q = question();
        assert!(lenient_match(&q, "sa").is_none());
        q.options.push(ChoiceOption::new("San Antonio", "sai"));
        // "san" hits both Santiago and San Antonio.
        assert!(lenient_match(&q, "san").is_none());
    }

    #[tokio::test]
    async fn interpreter_result_must_name_a_real_option() {
        let q = question();
        let good = FixedInterpreter(Some(CoercedOption {
            value: "scl".to_string(),
            label: "anything".to_string(),
        }));
        let coerced = coerce_option(Some(&good), &q, "the capital", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(coerced.value, "scl");
        assert_eq!(coerced.label, "Santiago");

        let bad = FixedInterpreter(Some(CoercedOption {
            value: "bogus".to_string(),
            label: "Bogus".to_string(),
        }));
        assert!(
            coerce_option(Some(&bad), &q, "the capital", Duration::from_secs(1))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn interpreter_failure_degrades_to_no_match() {
        let q = question();
        assert!(
            coerce_option(Some(&FailingInterpreter), &q, "the capital", Duration::from_secs(1))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn no_interpreter_means_no_match() {
        let q = question();
        assert!(coerce_option(None, &q, "the capital", Duration::from_secs(1)).await.is_none());
    }
}
