// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Control command and intent recognition over inbound text.
//!
//! Matching is keyword-based: input is lowercased and stripped of diacritics
//! before comparison, so "reiniciar" and "REINICIAR" behave alike. English
//! and Spanish keywords are both recognized.

use unicode_normalization::UnicodeNormalization;

use formflow_core::types::Button;

/// A recognized control command. Commands pre-empt the form flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Restart,
    Back,
    Status,
    Handoff,
    Pause,
    Resume,
    RequestReview,
    BlockStatus,
    StartForm,
    /// Switch to a specific template.
    SetForm(String),
    FormList,
    FormWeb,
    Chat,
    Summary,
    DeleteData,
}

/// Lowercase and strip combining marks. NFD decomposition turns "á" into
/// "a" plus a combining acute, which is then dropped.
pub fn fold(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c, '\u{0300}'..='\u{036F}')
}

/// Parse a control command from inbound text. Whole-message matching only:
/// a command word inside a longer sentence is not a command, except for the
/// explicit `SET_FORM:` and "use <code>" forms.
pub fn parse_command(text: &str) -> Option<Command> {
    let raw = text.trim();
    if let Some(code) = extract_set_form(raw) {
        return Some(Command::SetForm(code));
    }
    let folded = fold(raw);
    let command = match folded.as_str() {
        "restart" | "reset" | "reiniciar" | "empezar de nuevo" => Command::Restart,
        "back" | "undo" | "volver" | "atras" => Command::Back,
        "status" | "estado" | "donde voy" => Command::Status,
        "human" | "agent" | "humano" | "agente" | "operador" => Command::Handoff,
        "pause" | "pausa" | "pausar" => Command::Pause,
        "resume" | "continue" | "continuar" | "reanudar" => Command::Resume,
        "review" | "revision" | "revisar" => Command::RequestReview,
        "blocks" | "bloques" => Command::BlockStatus,
        "form" | "formulario" | "start_form" => Command::StartForm,
        "forms" | "formularios" | "form_list" => Command::FormList,
        "web" | "form_web" => Command::FormWeb,
        "chat" | "chatear" => Command::Chat,
        "summary" | "resumen" => Command::Summary,
        "delete my data" | "eliminar mis datos" | "borrar mis datos" => Command::DeleteData,
        _ => return None,
    };
    Some(command)
}

/// Extract a template code from `SET_FORM:<code>` (button payloads) or
/// "use <code>" / "usar <code>" free text.
pub fn extract_set_form(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if let Some(code) = trimmed.strip_prefix("SET_FORM:") {
        let code = code.trim();
        if !code.is_empty() {
            return Some(code.to_string());
        }
        return None;
    }
    let folded = fold(trimmed);
    for prefix in ["use ", "usar "] {
        if let Some(rest) = folded.strip_prefix(prefix) {
            let code: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
                .collect();
            if !code.is_empty() {
                return Some(code);
            }
        }
    }
    None
}

const AFFIRMATIVE: &[&str] = &[
    "yes", "si", "ok", "sure", "accept", "i accept", "acepto", "si, acepto", "dale",
    "de acuerdo", "confirmo", "agreed",
];

const NEGATIVE: &[&str] = &[
    "no", "decline", "i decline", "rechazo", "no acepto", "no quiero", "cancel", "cancelar",
];

/// Consent button payload for acceptance.
pub const CONSENT_YES: &str = "CONSENT_YES";
/// Consent button payload for refusal.
pub const CONSENT_NO: &str = "CONSENT_NO";

/// Whether text reads as consent. Button payloads match exactly; free text
/// matches when it starts with an affirmative word.
pub fn is_affirmative(text: &str) -> bool {
    if text.trim() == CONSENT_YES {
        return true;
    }
    let folded = fold(text.trim());
    AFFIRMATIVE
        .iter()
        .any(|w| folded == *w || folded.starts_with(&format!("{w} ")))
}

/// Whether text reads as refusal.
pub fn is_negative(text: &str) -> bool {
    if text.trim() == CONSENT_NO {
        return true;
    }
    let folded = fold(text.trim());
    NEGATIVE
        .iter()
        .any(|w| folded == *w || folded.starts_with(&format!("{w} ")))
}

/// Whether free text shows intent to work on the form, used at the consent
/// gate to tell form requests apart from chatter.
pub fn is_form_intent(text: &str) -> bool {
    let folded = fold(text);
    ["form", "formulario", "encuesta", "survey"]
        .iter()
        .any(|w| folded.contains(w))
}

/// First configured topic keyword found in the text, if any.
pub fn detect_topic(text: &str, keywords: &[String]) -> Option<String> {
    let folded = fold(text);
    keywords
        .iter()
        .find(|k| !k.is_empty() && folded.contains(&fold(k)))
        .cloned()
}

/// The standard quick-reply menu shown outside the question flow.
pub fn menu_buttons() -> Vec<Button> {
    vec![
        Button::new("Start form", "START_FORM"),
        Button::new("My forms", "FORM_LIST"),
        Button::new("Chat", "CHAT"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_diacritics_and_case() {
        assert_eq!(fold("REINICIAR"), "reiniciar");
        assert_eq!(fold("Atrás"), "atras");
        assert_eq!(fold("Revisión"), "revision");
    }

    #[test]
    fn commands_match_whole_message_only() {
        assert_eq!(parse_command("Reiniciar"), Some(Command::Restart));
        assert_eq!(parse_command("  atrás "), Some(Command::Back));
        assert_eq!(parse_command("estado"), Some(Command::Status));
        assert_eq!(parse_command("I want to restart maybe"), None);
        assert_eq!(parse_command("my name is agent smith"), None);
    }

    #[test]
    fn set_form_button_and_free_text() {
        assert_eq!(
            parse_command("SET_FORM:survey"),
            Some(Command::SetForm("survey".to_string()))
        );
        assert_eq!(
            parse_command("use intake-v2 please"),
            Some(Command::SetForm("intake-v2".to_string()))
        );
        assert_eq!(parse_command("SET_FORM:"), None);
    }

    #[test]
    fn consent_words() {
        assert!(is_affirmative("Sí, acepto"));
        assert!(is_affirmative("CONSENT_YES"));
        assert!(is_affirmative("yes please"));
        assert!(!is_affirmative("not yes"));
        assert!(is_negative("No acepto"));
        assert!(is_negative("no"));
        assert!(!is_negative("nothing to see"));
    }

    #[test]
    fn negative_phrasing_with_affirmative_word_stays_negative() {
        assert!(is_negative("no acepto"));
        assert!(!is_affirmative("no acepto"));
    }

    #[test]
    fn topic_detection_uses_folded_containment() {
        let keywords = vec!["diabetes".to_string(), "cáncer".to_string()];
        assert_eq!(
            detect_topic("my mother has Cancer", &keywords),
            Some("cáncer".to_string())
        );
        assert_eq!(detect_topic("all good here", &keywords), None);
    }

    #[test]
    fn form_intent() {
        assert!(is_form_intent("quiero llenar el formulario"));
        assert!(is_form_intent("can we do the form now"));
        assert!(!is_form_intent("hello there"));
    }
}
