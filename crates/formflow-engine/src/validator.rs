// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic per-type answer validation.
//!
//! Validation is pure: it receives the question definition and the message
//! input and either produces a normalized [`ValidAnswer`] or a typed
//! [`ValidationError`] the renderer turns into a re-prompt. Choice coercion
//! beyond the deterministic rules lives in [`crate::interpret`].

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use strum::Display;

use formflow_core::types::{ChoiceOption, Question, QuestionType};

use crate::command::fold;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?\d[\d\s()\-]{7,}$").unwrap()
});

static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})$").unwrap()
});

/// Why an input was rejected for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ValidationError {
    Required,
    InvalidOption,
    InvalidDate,
    InvalidEmail,
    InvalidPhone,
    InvalidName,
}

/// The text side of an inbound message, as seen by validation.
#[derive(Debug, Clone, Copy)]
pub struct MessageInput<'a> {
    pub text: Option<&'a str>,
    pub attachment_count: usize,
}

/// A validated, normalized answer ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidAnswer {
    /// Canonical value (`None` for attachment-only submissions).
    pub value: Option<String>,
    /// Option label when the answer came from a choice list.
    pub label: Option<String>,
    /// Raw input when it differs from the stored value.
    pub raw: Option<String>,
}

impl ValidAnswer {
    fn text(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            label: None,
            raw: None,
        }
    }

    fn attachment_only() -> Self {
        Self {
            value: None,
            label: None,
            raw: None,
        }
    }
}

/// Validate and normalize one input against a question definition.
pub fn validate(question: &Question, input: &MessageInput<'_>) -> Result<ValidAnswer, ValidationError> {
    let text = input.text.unwrap_or("").trim();

    if text.is_empty() {
        if input.attachment_count > 0 {
            // Attachment-only submission: accepted regardless of type, the
            // evidence pipeline decides whether the files are enough.
            return Ok(ValidAnswer::attachment_only());
        }
        if question.required {
            return Err(ValidationError::Required);
        }
        return Ok(ValidAnswer::text(""));
    }

    match question.qtype {
        QuestionType::Dropdown | QuestionType::SingleChoice => {
            match coerce_selection(&question.options, text) {
                Some(opt) => Ok(ValidAnswer {
                    value: Some(opt.value.clone()),
                    label: Some(opt.label.clone()),
                    raw: Some(text.to_string()),
                }),
                None => Err(ValidationError::InvalidOption),
            }
        }
        QuestionType::Date => match parse_date(text) {
            Some(iso) => Ok(ValidAnswer {
                value: Some(iso),
                label: None,
                raw: Some(text.to_string()),
            }),
            None => Err(ValidationError::InvalidDate),
        },
        QuestionType::Email => {
            if EMAIL_RE.is_match(text) {
                Ok(ValidAnswer::text(text.to_lowercase()))
            } else {
                Err(ValidationError::InvalidEmail)
            }
        }
        QuestionType::Phone => {
            if PHONE_RE.is_match(text) {
                Ok(ValidAnswer::text(text))
            } else {
                Err(ValidationError::InvalidPhone)
            }
        }
        QuestionType::Name => {
            if text.chars().count() >= 3 {
                Ok(ValidAnswer::text(text))
            } else {
                Err(ValidationError::InvalidName)
            }
        }
        QuestionType::Text => Ok(ValidAnswer::text(text)),
    }
}

/// Deterministic option coercion.
///
/// Tried in order: label match ignoring case and diacritics, exact value
/// match, 1-based numeric index into the option list. Folding the label
/// comparison lets "si" land on a "Sí" option.
pub fn coerce_selection<'a>(options: &'a [ChoiceOption], text: &str) -> Option<&'a ChoiceOption> {
    let folded = fold(text);
    if let Some(opt) = options.iter().find(|o| fold(&o.label) == folded) {
        return Some(opt);
    }
    if let Some(opt) = options.iter().find(|o| o.value == text) {
        return Some(opt);
    }
    if let Ok(index) = text.parse::<usize>() {
        if index >= 1 && index <= options.len() {
            return Some(&options[index - 1]);
        }
    }
    None
}

/// Parse a date in ISO `YYYY-MM-DD` (or `YYYY/MM/DD`) form, falling back to
/// day-first `D/M/YYYY` with `/` or `-` separators. Calendar validity is
/// checked; the canonical output is always `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> Option<String> {
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date.format("%Y-%m-%d").to_string());
        }
    }
    let caps = DMY_RE.captures(text)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_core::types::Question;

    fn question(qtype: QuestionType) -> Question {
        Question::new("q1", "Question?", qtype)
    }

    fn text_input(text: &str) -> MessageInput<'_> {
        MessageInput {
            text: Some(text),
            attachment_count: 0,
        }
    }

    #[test]
    fn required_empty_input_is_rejected() {
        let q = question(QuestionType::Text);
        let err = validate(&q, &text_input("   ")).unwrap_err();
        assert_eq!(err, ValidationError::Required);
    }

    #[test]
    fn attachment_only_passes_required() {
        let q = question(QuestionType::Text);
        let input = MessageInput {
            text: None,
            attachment_count: 1,
        };
        let answer = validate(&q, &input).unwrap();
        assert_eq!(answer.value, None);
    }

    #[test]
    fn optional_empty_input_is_accepted() {
        let mut q = question(QuestionType::Text);
        q.required = false;
        let answer = validate(&q, &text_input("")).unwrap();
        assert_eq!(answer.value.as_deref(), Some(""));
    }

    #[test]
    fn email_is_lowercased() {
        let q = question(QuestionType::Email);
        let answer = validate(&q, &text_input("Ada@Example.COM")).unwrap();
        assert_eq!(answer.value.as_deref(), Some("ada@example.com"));
        assert_eq!(
            validate(&q, &text_input("nope")).unwrap_err(),
            ValidationError::InvalidEmail
        );
    }

    #[test]
    fn phone_accepts_international_format() {
        let q = question(QuestionType::Phone);
        assert!(validate(&q, &text_input("+56 9 1234 5678")).is_ok());
        assert_eq!(
            validate(&q, &text_input("12ab")).unwrap_err(),
            ValidationError::InvalidPhone
        );
    }

    #[test]
    fn name_needs_three_characters() {
        let q = question(QuestionType::Name);
        assert!(validate(&q, &text_input("Ada")).is_ok());
        assert_eq!(
            validate(&q, &text_input("Al")).unwrap_err(),
            ValidationError::InvalidName
        );
    }

    #[test]
    fn dates_normalize_to_iso() {
        let q = question(QuestionType::Date);
        for (input, expected) in [
            ("1999-12-31", "1999-12-31"),
            ("1999/12/31", "1999-12-31"),
            ("31/12/1999", "1999-12-31"),
            ("31-12-1999", "1999-12-31"),
            ("5/1/2020", "2020-01-05"),
        ] {
            let answer = validate(&q, &text_input(input)).unwrap();
            assert_eq!(answer.value.as_deref(), Some(expected), "input {input}");
        }
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        let q = question(QuestionType::Date);
        for input in ["31/02/2020", "2020-02-30", "0/1/2020", "tomorrow"] {
            assert_eq!(
                validate(&q, &text_input(input)).unwrap_err(),
                ValidationError::InvalidDate,
                "input {input}"
            );
        }
    }

    #[test]
    fn choice_coercion_order_label_value_index() {
        let options = vec![
            ChoiceOption::new("Yes", "1"),
            ChoiceOption::new("No", "0"),
        ];
        // Label match is case-insensitive and wins over index.
        assert_eq!(coerce_selection(&options, "yes").unwrap().value, "1");
        // Exact value match beats index interpretation: "1" is Yes's value.
        assert_eq!(coerce_selection(&options, "1").unwrap().label, "Yes");
        // Pure index fallback.
        assert_eq!(coerce_selection(&options, "2").unwrap().label, "No");
        assert!(coerce_selection(&options, "3").is_none());
        assert!(coerce_selection(&options, "maybe").is_none());
    }

    #[test]
    fn dropdown_grid_resolves_accented_and_plain_forms() {
        let mut q = question(QuestionType::Dropdown);
        q.options = vec![
            ChoiceOption::new("Sí", "yes"),
            ChoiceOption::new("No", "no"),
        ];
        for input in ["1", "si", "Sí", "yes"] {
            let answer = validate(&q, &text_input(input)).unwrap();
            assert_eq!(answer.value.as_deref(), Some("yes"), "input {input}");
        }
        assert_eq!(
            validate(&q, &text_input("maybe")).unwrap_err(),
            ValidationError::InvalidOption
        );
    }

    #[test]
    fn choice_answer_keeps_raw_and_label() {
        let mut q = question(QuestionType::SingleChoice);
        q.options = vec![ChoiceOption::new("Santiago", "scl")];
        let answer = validate(&q, &text_input("santiago")).unwrap();
        assert_eq!(answer.value.as_deref(), Some("scl"));
        assert_eq!(answer.label.as_deref(), Some("Santiago"));
        assert_eq!(answer.raw.as_deref(), Some("santiago"));
    }
}
