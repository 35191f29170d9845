// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Formflow engine and its collaborator traits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::FormflowError;

/// Identifies one conversation: a (user, form) pair.
///
/// At most one session exists per key; two users filling the same form, or one
/// user filling two forms, are independent sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub user_id: String,
    pub form_code: String,
}

impl SessionKey {
    pub fn new(user_id: impl Into<String>, form_code: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            form_code: form_code.into(),
        }
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.user_id, self.form_code)
    }
}

// --- Template types ---

/// The type of a question, driving validation and rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Name,
    Email,
    Phone,
    Date,
    /// `select_one` is a legacy authoring alias for dropdown.
    #[serde(alias = "select_one")]
    Dropdown,
    SingleChoice,
}

impl QuestionType {
    /// Whether answers are matched against an option list.
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionType::Dropdown | QuestionType::SingleChoice)
    }
}

/// One selectable option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Equality used for visibility conditions and option values: numeric when
/// either side parses as a number, case-sensitive string equality otherwise.
pub fn values_equal(a: &str, b: &str) -> bool {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x == y,
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => false,
        _ => a == b,
    }
}

/// Shows a question only when a previously-asked question has a given answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityCondition {
    /// The referenced question; must appear earlier in template order.
    pub qid: String,
    /// Expected stored value, compared with [`values_equal`].
    pub equals: String,
}

/// Identifies which conversational agent a reply is attributed to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentRole {
    Primary,
    Medic,
    Nurse,
    Specialist,
    System,
}

/// Optional per-question behavior flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuestionBehavior {
    /// Run the risk evaluator on structurally valid answers.
    pub risk_check: bool,
    /// Attachments on this question go through the evidence validator.
    pub requires_evidence: bool,
    /// Evidence additionally needs a semantic consistency check.
    pub requires_semantic_check: bool,
    /// Per-question evidence size ceiling; engine default applies when unset.
    pub max_evidence_size_mb: Option<u64>,
    /// Agent attributed to replies about this question.
    pub agent: Option<AgentRole>,
}

/// A single question of a form template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub qid: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub qtype: QuestionType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub options: Vec<ChoiceOption>,
    #[serde(default)]
    pub show_if: Option<VisibilityCondition>,
    #[serde(default = "default_block_id")]
    pub block_id: String,
    #[serde(default)]
    pub behavior: QuestionBehavior,
}

fn default_block_id() -> String {
    "default".to_string()
}

// Questions are required unless the template says otherwise.
fn default_required() -> bool {
    true
}

impl Question {
    /// A plain question with no options, condition, or behavior flags.
    pub fn new(qid: impl Into<String>, label: impl Into<String>, qtype: QuestionType) -> Self {
        Self {
            qid: qid.into(),
            label: label.into(),
            description: None,
            qtype,
            required: true,
            options: Vec::new(),
            show_if: None,
            block_id: default_block_id(),
            behavior: QuestionBehavior::default(),
        }
    }
}

/// Descriptor of an external side effect requested at block completion.
///
/// The engine records it and surfaces it to the caller; it never executes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_method() -> String {
    "POST".to_string()
}

/// An ordered grouping of questions treated as a unit for progress tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub on_complete: Option<ActionDescriptor>,
}

impl Block {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            on_complete: None,
        }
    }
}

/// Grouped authoring shape: a titled bundle of questions sharing a block and
/// optionally a visibility condition. Normalized into the flat question list
/// by [`FormTemplate::from_groups`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionGroup {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub applies_when: Option<VisibilityCondition>,
    #[serde(default)]
    pub on_complete: Option<ActionDescriptor>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// The static definition of a form's questions and blocks. Immutable per version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormTemplate {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub version: u32,
    pub is_active: bool,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl FormTemplate {
    /// Builds a template, enforcing authoring invariants: qids are unique and
    /// every visibility condition references an earlier question.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        version: u32,
        questions: Vec<Question>,
        blocks: Vec<Block>,
    ) -> Result<Self, FormflowError> {
        let mut seen: Vec<&str> = Vec::with_capacity(questions.len());
        for q in &questions {
            if seen.contains(&q.qid.as_str()) {
                return Err(FormflowError::Template(format!(
                    "duplicate qid '{}'",
                    q.qid
                )));
            }
            if let Some(cond) = &q.show_if {
                if !seen.contains(&cond.qid.as_str()) {
                    return Err(FormflowError::Template(format!(
                        "question '{}' has show_if referencing '{}', which does not appear earlier",
                        q.qid, cond.qid
                    )));
                }
            }
            seen.push(&q.qid);
        }
        Ok(Self {
            code: code.into(),
            name: name.into(),
            description: None,
            version,
            is_active: true,
            questions,
            blocks,
        })
    }

    /// Builds a template from grouped authoring shape: each group becomes a
    /// block, its questions inherit the block id and, when they carry no
    /// condition of their own, the group's condition.
    pub fn from_groups(
        code: impl Into<String>,
        name: impl Into<String>,
        version: u32,
        groups: Vec<QuestionGroup>,
    ) -> Result<Self, FormflowError> {
        let mut questions = Vec::new();
        let mut blocks = Vec::new();
        for group in groups {
            let block_id = group.group_id.unwrap_or_else(default_block_id);
            blocks.push(Block {
                id: block_id.clone(),
                name: group.title.unwrap_or_else(|| block_id.clone()),
                description: group.description,
                on_complete: group.on_complete,
            });
            for mut q in group.questions {
                if q.show_if.is_none() {
                    q.show_if = group.applies_when.clone();
                }
                q.block_id = block_id.clone();
                questions.push(q);
            }
        }
        Self::new(code, name, version, questions, blocks)
    }

    pub fn question(&self, qid: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.qid == qid)
    }

    /// The effective block list: declared blocks (first declaration wins),
    /// followed by blocks only implied by question `block_id`s, in order of
    /// first appearance. Never empty.
    pub fn build_blocks(&self) -> Vec<Block> {
        let mut out: Vec<Block> = Vec::new();
        for b in &self.blocks {
            if !out.iter().any(|x| x.id == b.id) {
                out.push(b.clone());
            }
        }
        for q in &self.questions {
            if !out.iter().any(|x| x.id == q.block_id) {
                out.push(Block::new(q.block_id.clone()));
            }
        }
        if out.is_empty() {
            out.push(Block::new(default_block_id()));
        }
        out
    }
}

// --- Session types ---

/// Lifecycle status of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Initial: consent has not been given yet.
    AwaitingConsent,
    /// Actively answering questions.
    InProgress,
    /// All visible questions answered. Re-enterable via restart.
    Completed,
    /// Consent refused.
    Cancelled,
    /// Escalated to human review; question flow halted.
    PendingReview,
    /// Explicit human-takeover request.
    Handoff,
    /// A block completed with an external action pending; waiting to resume.
    AwaitingExternal,
}

/// Progress status of one block within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Pending,
    InProgress,
    Done,
    NeedsReview,
}

/// Per-block attempt counter and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProgress {
    pub block_id: String,
    pub status: BlockStatus,
    pub attempts: u32,
    #[serde(default)]
    pub pending_action: Option<ActionDescriptor>,
}

impl BlockProgress {
    pub fn new(block_id: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            status: BlockStatus::Pending,
            attempts: 0,
            pending_action: None,
        }
    }
}

/// A file attached to an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// An attachment retained as evidence on an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub url: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
    pub attached_at: DateTime<Utc>,
}

impl From<Attachment> for Evidence {
    fn from(a: Attachment) -> Self {
        Self {
            url: a.url,
            mime: a.mime,
            filename: a.filename,
            size_bytes: a.size_bytes,
            attached_at: Utc::now(),
        }
    }
}

/// Verification sub-state of an answer that required evidence review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub status: VerificationStatus,
    #[serde(default)]
    pub reason: Option<String>,
    pub attempts: u32,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Passed,
    Failed,
}

/// One stored answer. At most one live entry per qid (upsert semantics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub qid: String,
    /// Normalized value; `None` for attachment-only answers.
    pub value: Option<String>,
    /// Human-readable label for choice answers.
    #[serde(default)]
    pub label: Option<String>,
    /// Original raw input.
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub verification: Option<Verification>,
    pub answered_at: DateTime<Utc>,
}

impl Answer {
    pub fn new(qid: impl Into<String>, value: Option<String>) -> Self {
        Self {
            qid: qid.into(),
            value,
            label: None,
            raw: None,
            evidence: Vec::new(),
            verification: None,
            answered_at: Utc::now(),
        }
    }
}

/// Typed ephemeral UI state carried by a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionNotes {
    /// Per-question page index for long option lists.
    pub option_pages: BTreeMap<String, usize>,
    /// Topic keyword detected in free text, kept for context.
    pub detected_topic: Option<String>,
    /// User opted into free chat instead of the form flow.
    pub free_chat: bool,
}

/// The mutable, per-user, per-template conversation state.
///
/// Status transitions go through the engine's transition functions; answers are
/// only mutated through [`Session::upsert_answer`] and friends so the
/// one-live-entry-per-qid invariant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub key: SessionKey,
    #[serde(default)]
    pub user_name: Option<String>,
    pub channel: String,
    pub status: SessionStatus,
    /// Cursor hint: the question currently in flight, if any.
    #[serde(default)]
    pub current_qid: Option<String>,
    #[serde(default)]
    pub current_block_id: Option<String>,
    #[serde(default)]
    pub consent_prompted: bool,
    #[serde(default)]
    pub notes: SessionNotes,
    #[serde(default)]
    pub answers: Vec<Answer>,
    #[serde(default)]
    pub block_statuses: Vec<BlockProgress>,
    #[serde(default)]
    pub delete_requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delete_purge_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey, user_name: Option<String>, channel: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key,
            user_name,
            channel: channel.into(),
            status: SessionStatus::AwaitingConsent,
            current_qid: None,
            current_block_id: None,
            consent_prompted: false,
            notes: SessionNotes::default(),
            answers: Vec::new(),
            block_statuses: Vec::new(),
            delete_requested_at: None,
            delete_purge_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn answer(&self, qid: &str) -> Option<&Answer> {
        self.answers.iter().find(|a| a.qid == qid)
    }

    /// Inserts or replaces the answer for its qid, preserving any evidence
    /// already attached to a replaced entry.
    pub fn upsert_answer(&mut self, mut answer: Answer) {
        answer.answered_at = Utc::now();
        if let Some(existing) = self.answers.iter_mut().find(|a| a.qid == answer.qid) {
            if answer.evidence.is_empty() {
                answer.evidence = std::mem::take(&mut existing.evidence);
            }
            *existing = answer;
        } else {
            self.answers.push(answer);
        }
        self.touch();
    }

    /// Removes and returns the most recently appended answer ("back one").
    pub fn pop_last_answer(&mut self) -> Option<Answer> {
        let popped = self.answers.pop();
        if popped.is_some() {
            self.current_qid = None;
            self.current_block_id = None;
            self.touch();
        }
        popped
    }

    /// Appends evidence to the answer for `qid`, creating a null-valued
    /// placeholder answer entry if none exists yet.
    pub fn attach_evidence(&mut self, qid: &str, attachments: Vec<Evidence>) {
        if attachments.is_empty() {
            return;
        }
        match self.answers.iter_mut().find(|a| a.qid == qid) {
            Some(a) => a.evidence.extend(attachments),
            None => {
                let mut placeholder = Answer::new(qid, None);
                placeholder.evidence = attachments;
                self.answers.push(placeholder);
            }
        }
        self.touch();
    }

    pub fn block_progress(&self, block_id: &str) -> Option<&BlockProgress> {
        self.block_statuses.iter().find(|b| b.block_id == block_id)
    }

    /// The progress entry for `block_id`, created as `Pending` if absent.
    pub fn block_progress_mut(&mut self, block_id: &str) -> &mut BlockProgress {
        if let Some(i) = self.block_statuses.iter().position(|b| b.block_id == block_id) {
            return &mut self.block_statuses[i];
        }
        self.block_statuses.push(BlockProgress::new(block_id));
        self.block_statuses.last_mut().expect("just pushed")
    }

    /// Full restart: back to the initial state with answers and block progress
    /// wiped. The only path that resets attempt counters.
    pub fn restart(&mut self) {
        self.status = SessionStatus::AwaitingConsent;
        self.current_qid = None;
        self.current_block_id = None;
        self.consent_prompted = false;
        self.answers.clear();
        self.block_statuses.clear();
        self.notes.option_pages.clear();
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// --- Event log types ---

/// Direction of a logged message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    In,
    Out,
}

/// One append-only event log entry. Used for duplicate suppression and short
/// conversational context only; it never drives the state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub direction: Direction,
    /// Channel-assigned message identifier, when the channel provides one.
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub agent: AgentRole,
    pub ts: DateTime<Utc>,
}

impl EventRecord {
    pub fn inbound(message_id: Option<String>, text: Option<String>) -> Self {
        Self {
            direction: Direction::In,
            message_id,
            text,
            attachments: Vec::new(),
            agent: AgentRole::Primary,
            ts: Utc::now(),
        }
    }

    pub fn outbound(text: impl Into<String>, agent: AgentRole) -> Self {
        Self {
            direction: Direction::Out,
            message_id: None,
            text: Some(text.into()),
            attachments: Vec::new(),
            agent,
            ts: Utc::now(),
        }
    }
}

// --- Engine I/O types ---

/// An inbound message from the channel adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Channel-assigned identifier used for duplicate suppression.
    #[serde(default)]
    pub message_id: Option<String>,
    pub user_id: String,
    #[serde(default)]
    pub user_name: Option<String>,
    pub channel: String,
    /// Overrides the engine's default form code when set.
    #[serde(default)]
    pub form_code: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

/// A quick-reply button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub value: String,
}

impl Button {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Metadata echoed with every reply so the channel adapter can route and log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMeta {
    pub session_status: SessionStatus,
    pub current_qid: Option<String>,
    pub current_block_id: Option<String>,
    pub form_code: String,
    pub user_id: String,
}

/// The rendered response for one processed message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
    pub meta: ReplyMeta,
}

/// A structured side-effect request for the caller to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Route the conversation to a human.
    Handoff,
    /// Call an external endpoint with the descriptor's payload.
    CallApi(ActionDescriptor),
}

/// Everything produced by processing one inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// `None` only for absorbed duplicate deliveries (acknowledgment only).
    pub reply: Option<Reply>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl TurnOutcome {
    pub fn reply(reply: Reply) -> Self {
        Self {
            reply: Some(reply),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(reply: Reply, actions: Vec<Action>) -> Self {
        Self {
            reply: Some(reply),
            actions,
        }
    }

    /// Silent acknowledgment for duplicate deliveries.
    pub fn absorbed() -> Self {
        Self {
            reply: None,
            actions: Vec::new(),
        }
    }
}

// --- Collaborator result types ---

/// A coerced choice produced by the answer interpreter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoercedOption {
    pub value: String,
    pub label: String,
}

/// Verdict of the risk evaluator on a validated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskVerdict {
    pub ok: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Verdict of the evidence validator on an answer's attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceVerdict {
    pub ok: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Payload delivered to the finalize sink when a session completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizePayload {
    pub user_id: String,
    pub form_code: String,
    pub status: SessionStatus,
    pub answers: Vec<Answer>,
    pub block_statuses: Vec<BlockProgress>,
    pub completed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_equal_is_numeric_aware() {
        assert!(values_equal("1", "1.0"));
        assert!(values_equal(" 2 ", "2"));
        assert!(!values_equal("1", "2"));
        assert!(values_equal("yes", "yes"));
        assert!(!values_equal("Yes", "yes"));
        assert!(!values_equal("1", "one"));
    }

    #[test]
    fn template_rejects_duplicate_qids() {
        let q1 = Question::new("q1", "First", QuestionType::Text);
        let q2 = Question::new("q1", "Again", QuestionType::Text);
        let err = FormTemplate::new("f", "Form", 1, vec![q1, q2], vec![]).unwrap_err();
        assert!(matches!(err, FormflowError::Template(_)));
    }

    #[test]
    fn template_rejects_forward_show_if() {
        let mut q1 = Question::new("q1", "First", QuestionType::Text);
        q1.show_if = Some(VisibilityCondition {
            qid: "q2".into(),
            equals: "yes".into(),
        });
        let q2 = Question::new("q2", "Second", QuestionType::Text);
        let err = FormTemplate::new("f", "Form", 1, vec![q1, q2], vec![]).unwrap_err();
        assert!(matches!(err, FormflowError::Template(_)));
    }

    #[test]
    fn from_groups_normalizes_blocks_and_conditions() {
        let gate = Question::new("gate", "Proceed?", QuestionType::Dropdown);
        let mut detail = Question::new("detail", "Detail", QuestionType::Text);
        detail.show_if = None;
        let groups = vec![
            QuestionGroup {
                group_id: Some("a".into()),
                title: Some("Block A".into()),
                description: None,
                applies_when: None,
                on_complete: None,
                questions: vec![gate],
            },
            QuestionGroup {
                group_id: Some("b".into()),
                title: None,
                description: None,
                applies_when: Some(VisibilityCondition {
                    qid: "gate".into(),
                    equals: "yes".into(),
                }),
                on_complete: None,
                questions: vec![detail],
            },
        ];
        let t = FormTemplate::from_groups("f", "Form", 1, groups).unwrap();
        assert_eq!(t.questions.len(), 2);
        assert_eq!(t.questions[1].block_id, "b");
        assert_eq!(
            t.questions[1].show_if.as_ref().unwrap().qid,
            "gate"
        );
        assert_eq!(t.blocks.len(), 2);
        assert_eq!(t.blocks[1].name, "b");
    }

    #[test]
    fn build_blocks_merges_declared_and_implicit() {
        let mut q1 = Question::new("q1", "One", QuestionType::Text);
        q1.block_id = "a".into();
        let mut q2 = Question::new("q2", "Two", QuestionType::Text);
        q2.block_id = "b".into();
        let declared = vec![Block {
            id: "a".into(),
            name: "Block A".into(),
            description: None,
            on_complete: None,
        }];
        let t = FormTemplate::new("f", "Form", 1, vec![q1, q2], declared).unwrap();
        let blocks = t.build_blocks();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "Block A");
        assert_eq!(blocks[1].id, "b");
    }

    #[test]
    fn upsert_answer_replaces_by_qid_and_keeps_evidence() {
        let mut s = Session::new(SessionKey::new("u", "f"), None, "test");
        let mut first = Answer::new("q1", Some("a".into()));
        first.evidence.push(Evidence {
            url: "https://example.com/x.pdf".into(),
            mime: Some("application/pdf".into()),
            filename: None,
            size_bytes: None,
            attached_at: Utc::now(),
        });
        s.upsert_answer(first);
        s.upsert_answer(Answer::new("q1", Some("b".into())));
        assert_eq!(s.answers.len(), 1);
        assert_eq!(s.answers[0].value.as_deref(), Some("b"));
        assert_eq!(s.answers[0].evidence.len(), 1);
    }

    #[test]
    fn pop_last_answer_clears_cursor() {
        let mut s = Session::new(SessionKey::new("u", "f"), None, "test");
        s.upsert_answer(Answer::new("q1", Some("a".into())));
        s.current_qid = Some("q2".into());
        s.current_block_id = Some("default".into());
        let popped = s.pop_last_answer().unwrap();
        assert_eq!(popped.qid, "q1");
        assert!(s.current_qid.is_none());
        assert!(s.current_block_id.is_none());
    }

    #[test]
    fn restart_wipes_answers_and_progress() {
        let mut s = Session::new(SessionKey::new("u", "f"), None, "test");
        s.status = SessionStatus::PendingReview;
        s.upsert_answer(Answer::new("q1", Some("a".into())));
        s.block_progress_mut("a").attempts = 3;
        s.notes.option_pages.insert("q1".into(), 2);
        s.restart();
        assert_eq!(s.status, SessionStatus::AwaitingConsent);
        assert!(s.answers.is_empty());
        assert!(s.block_statuses.is_empty());
        assert!(s.notes.option_pages.is_empty());
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&SessionStatus::AwaitingConsent).unwrap();
        assert_eq!(json, "\"AWAITING_CONSENT\"");
        assert_eq!(SessionStatus::PendingReview.to_string(), "PENDING_REVIEW");
        let parsed: SessionStatus = serde_json::from_str("\"AWAITING_EXTERNAL\"").unwrap();
        assert_eq!(parsed, SessionStatus::AwaitingExternal);
    }

    #[test]
    fn question_type_accepts_select_one_alias() {
        let q: QuestionType = serde_json::from_str("\"select_one\"").unwrap();
        assert_eq!(q, QuestionType::Dropdown);
        assert!(QuestionType::SingleChoice.is_choice());
        assert!(!QuestionType::Date.is_choice());
    }

    #[test]
    fn action_serializes_with_type_tag() {
        let json = serde_json::to_value(&Action::Handoff).unwrap();
        assert_eq!(json["type"], "HANDOFF");
        let call = Action::CallApi(ActionDescriptor {
            name: "notify".into(),
            endpoint: Some("https://example.com/hook".into()),
            method: "POST".into(),
            payload: serde_json::json!({}),
        });
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["type"], "CALL_API");
        assert_eq!(json["name"], "notify");
    }
}
