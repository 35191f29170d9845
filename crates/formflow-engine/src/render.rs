// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text rendering for engine replies.
//!
//! Produces [`Rendered`] fragments (text plus quick-reply buttons); the
//! engine attaches reply metadata before returning them to the caller.

use formflow_core::types::{
    Block, Button, FormTemplate, Question, Session, SessionStatus,
};

use crate::command::{CONSENT_NO, CONSENT_YES};
use crate::paging::PagedOptions;
use crate::validator::ValidationError;

/// A rendered reply fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    pub text: String,
    pub buttons: Vec<Button>,
}

impl Rendered {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            buttons: Vec::new(),
        }
    }

    /// Prepend another fragment's text, keeping this fragment's buttons.
    pub fn preceded_by(mut self, prefix: &str) -> Self {
        if !prefix.is_empty() {
            self.text = format!("{prefix}\n\n{}", self.text);
        }
        self
    }
}

/// The consent gate prompt.
pub fn consent_prompt(template: &FormTemplate, user_name: Option<&str>) -> Rendered {
    let greeting = match user_name {
        Some(name) => format!("Hi {name}!"),
        None => "Hi!".to_string(),
    };
    Rendered {
        text: format!(
            "{greeting} I'd like to walk you through the \"{}\" form. \
             Your answers will be stored so we can follow up. Do you agree to continue?",
            template.name
        ),
        buttons: vec![
            Button::new("Yes, I agree", CONSENT_YES),
            Button::new("No", CONSENT_NO),
        ],
    }
}

/// Render a question prompt. Choice questions list their (possibly paged)
/// options as numbered rows and buttons; a pagination sentinel row is added
/// while more pages remain.
pub fn question_prompt(question: &Question, paged: Option<&PagedOptions>) -> Rendered {
    let mut text = question.label.clone();
    if let Some(description) = &question.description {
        text.push('\n');
        text.push_str(description);
    }

    if !question.qtype.is_choice() {
        return Rendered::text(text);
    }

    let (options, page_offset, more_token) = match paged {
        Some(p) => (p.options.as_slice(), p.offset, p.more_token.as_deref()),
        None => (question.options.as_slice(), 0, None),
    };

    let mut buttons = Vec::with_capacity(options.len() + 1);
    for (i, option) in options.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", page_offset + i + 1, option.label));
        buttons.push(Button::new(option.label.clone(), option.value.clone()));
    }
    if let Some(token) = more_token {
        text.push_str("\nMore options are available on the next page.");
        buttons.push(Button::new("More options...", token.to_string()));
    }
    Rendered { text, buttons }
}

/// Re-prompt after a validation failure. The original question (with options)
/// is repeated below the error line.
pub fn validation_error(
    question: &Question,
    error: ValidationError,
    paged: Option<&PagedOptions>,
) -> Rendered {
    let line = match error {
        ValidationError::Required => "This question needs an answer before we continue.",
        ValidationError::InvalidOption => {
            "I couldn't match that to one of the options. Please pick one from the list."
        }
        ValidationError::InvalidDate => {
            "That doesn't look like a valid date. Please use day/month/year, e.g. 31/12/1990."
        }
        ValidationError::InvalidEmail => {
            "That doesn't look like a valid email address. Please try again."
        }
        ValidationError::InvalidPhone => {
            "That doesn't look like a valid phone number. Please include the area code."
        }
        ValidationError::InvalidName => "Please give me a full name (at least 3 characters).",
    };
    question_prompt(question, paged).preceded_by(line)
}

/// Evidence rejection re-prompt.
pub fn evidence_rejected(question: &Question, reason: Option<&str>) -> Rendered {
    let line = match reason {
        Some(reason) => format!("I couldn't accept those files: {reason}. Please try again."),
        None => "I couldn't accept those files. Please try again.".to_string(),
    };
    question_prompt(question, None).preceded_by(&line)
}

/// Intro line shown when entering a block.
pub fn block_intro(block: &Block) -> String {
    match &block.description {
        Some(description) => format!("— {} —\n{description}", block.name),
        None => format!("— {} —", block.name),
    }
}

/// Confirmation line when a block finishes.
pub fn block_completed(block: &Block) -> String {
    format!("Section \"{}\" completed, thank you.", block.name)
}

/// Final completion message, optionally with the answer summary appended.
pub fn completed(template: &FormTemplate, summary: Option<&str>) -> Rendered {
    let mut text = format!(
        "That was the last question. The \"{}\" form is complete. Thank you!",
        template.name
    );
    if let Some(summary) = summary {
        text.push_str("\n\n");
        text.push_str(summary);
    }
    Rendered {
        text,
        buttons: crate::command::menu_buttons(),
    }
}

/// Escalation notice when a block exhausts its attempts or a risk check
/// fails. A reviewer takes over from here.
pub fn escalated() -> Rendered {
    Rendered::text(
        "I'm having trouble with this answer, so I've asked a team member to review it. \
         We'll get back to you shortly.",
    )
}

/// Menu shown outside the active question flow.
pub fn idle_menu(session: &Session) -> Rendered {
    let line = match session.status {
        SessionStatus::Completed => "Your form is already complete.",
        SessionStatus::Cancelled => "Your form was cancelled.",
        SessionStatus::Handoff => "A team member has this conversation now.",
        SessionStatus::AwaitingExternal => {
            "We're waiting on an external step. I'll pick up the form once it's done, \
             or you can type \"resume\"."
        }
        _ => "What would you like to do?",
    };
    Rendered {
        text: format!("{line} You can start a form or just chat."),
        buttons: crate::command::menu_buttons(),
    }
}

/// Human-takeover confirmation.
pub fn handoff_notice() -> Rendered {
    Rendered::text("Understood. I've asked a team member to take over this conversation.")
}

/// Pause confirmation.
pub fn paused() -> Rendered {
    Rendered::text("Paused. Type \"resume\" whenever you want to continue.")
}

/// Consent-refusal acknowledgment.
pub fn consent_declined() -> Rendered {
    Rendered {
        text: "No problem, nothing was stored. You can type \"form\" any time to start over."
            .to_string(),
        buttons: crate::command::menu_buttons(),
    }
}

/// Free-chat invitation at the consent gate.
pub fn chat_invitation() -> Rendered {
    Rendered {
        text: "Happy to chat! When you want to fill in the form, tap the button or type \"form\"."
            .to_string(),
        buttons: crate::command::menu_buttons(),
    }
}

/// Deletion-request acknowledgment.
pub fn deletion_scheduled(days: i64) -> Rendered {
    Rendered::text(format!(
        "Understood. Your data is scheduled for deletion in {days} days. \
         Starting a new form before then will cancel the deletion."
    ))
}

/// List of available templates with switch buttons.
pub fn form_list(templates: &[FormTemplate]) -> Rendered {
    if templates.is_empty() {
        return Rendered::text("There are no forms available right now.");
    }
    let mut text = String::from("Available forms:");
    let mut buttons = Vec::with_capacity(templates.len());
    for t in templates {
        text.push_str(&format!("\n• {} ({})", t.name, t.code));
        buttons.push(Button::new(t.name.clone(), format!("SET_FORM:{}", t.code)));
    }
    Rendered { text, buttons }
}

/// Per-block progress listing.
pub fn block_status(template: &FormTemplate, session: &Session) -> Rendered {
    let mut text = String::from("Section progress:");
    for block in template.build_blocks() {
        let status = session
            .block_progress(&block.id)
            .map(|p| p.status.to_string())
            .unwrap_or_else(|| "PENDING".to_string());
        text.push_str(&format!("\n• {}: {status}", block.name));
    }
    Rendered::text(text)
}

/// Answer summary: one line per answered question, in template order.
pub fn summary_text(template: &FormTemplate, session: &Session) -> String {
    let mut lines = vec![format!("Summary of \"{}\":", template.name)];
    for question in &template.questions {
        if let Some(answer) = session.answer(&question.qid) {
            let shown = answer
                .label
                .as_deref()
                .or(answer.value.as_deref())
                .unwrap_or("(attachment)");
            lines.push(format!("• {}: {shown}", question.label));
        }
    }
    if lines.len() == 1 {
        lines.push("• (no answers yet)".to_string());
    }
    lines.join("\n")
}

/// Where-am-I status line plus the current question, if any.
pub fn status_line(session: &Session, answered: usize, total_visible: usize) -> String {
    format!(
        "Status: {}. Answered {answered} of {total_visible} questions.",
        session.status
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use formflow_core::types::{Answer, ChoiceOption, QuestionType, SessionKey};

    fn template() -> FormTemplate {
        let mut q = Question::new("city", "Which city?", QuestionType::Dropdown);
        q.options = vec![
            ChoiceOption::new("Santiago", "scl"),
            ChoiceOption::new("Valparaiso", "vap"),
        ];
        FormTemplate::new("intake", "Intake", 1, vec![q], Vec::new()).unwrap()
    }

    #[test]
    fn choice_prompt_numbers_options_and_builds_buttons() {
        let t = template();
        let rendered = question_prompt(t.question("city").unwrap(), None);
        assert!(rendered.text.contains("1. Santiago"));
        assert!(rendered.text.contains("2. Valparaiso"));
        assert_eq!(rendered.buttons.len(), 2);
        assert_eq!(rendered.buttons[0].value, "scl");
    }

    #[test]
    fn text_prompt_has_no_buttons() {
        let q = Question::new("name", "Your name?", QuestionType::Name);
        let rendered = question_prompt(&q, None);
        assert_eq!(rendered.text, "Your name?");
        assert!(rendered.buttons.is_empty());
    }

    #[test]
    fn validation_error_repeats_the_question() {
        let t = template();
        let rendered =
            validation_error(t.question("city").unwrap(), ValidationError::InvalidOption, None);
        assert!(rendered.text.contains("couldn't match"));
        assert!(rendered.text.contains("1. Santiago"));
    }

    #[test]
    fn paged_prompt_carries_more_sentinel() {
        let t = template();
        let paged = PagedOptions {
            options: vec![ChoiceOption::new("Santiago", "scl")],
            page: 0,
            offset: 0,
            more_token: Some("MORE:city:1".to_string()),
        };
        let rendered = question_prompt(t.question("city").unwrap(), Some(&paged));
        assert_eq!(rendered.buttons.last().unwrap().value, "MORE:city:1");
    }

    #[test]
    fn summary_prefers_labels_over_values() {
        let t = template();
        let mut s = Session::new(SessionKey::new("u1", "intake"), None, "test");
        let mut a = Answer::new("city", Some("scl".to_string()));
        a.label = Some("Santiago".to_string());
        s.upsert_answer(a);
        let summary = summary_text(&t, &s);
        assert!(summary.contains("Which city?: Santiago"));
    }

    #[test]
    fn consent_prompt_greets_by_name() {
        let t = template();
        let rendered = consent_prompt(&t, Some("Ada"));
        assert!(rendered.text.starts_with("Hi Ada!"));
        assert_eq!(rendered.buttons[0].value, CONSENT_YES);
    }
}
