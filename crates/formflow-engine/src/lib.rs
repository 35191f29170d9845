// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Formflow turn engine.
//!
//! [`FormEngine::process`] takes one inbound message and produces one
//! [`TurnOutcome`]: a rendered reply plus any structured actions for the
//! caller to execute. The engine owns all session state transitions; channel
//! adapters stay thin.
//!
//! Turn order: template lookup, duplicate suppression, control commands,
//! consent gate, then the question flow (pagination, validation, coercion,
//! risk and evidence checks, block progression, completion).

pub mod command;
pub mod evidence;
pub mod fsm;
pub mod interpret;
pub mod paging;
pub mod progress;
pub mod render;
pub mod resolver;
pub mod validator;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use formflow_config::FormflowConfig;
use formflow_core::error::FormflowError;
use formflow_core::traits::{
    AnswerInterpreter, EvidenceValidator, FinalizeSink, RiskEvaluator, SessionStore,
    TemplateProvider,
};
use formflow_core::types::{
    Action, AgentRole, Answer, Block, BlockStatus, EventRecord, EvidenceVerdict, FinalizePayload,
    FormTemplate, InboundMessage, Question, QuestionType, Reply, ReplyMeta, Session, SessionKey,
    SessionStatus, TurnOutcome,
};

use crate::command::Command;
use crate::render::Rendered;
use crate::validator::{MessageInput, ValidationError};

/// The conversational-form engine. Cheap to clone behind [`Arc`]d
/// collaborators; one instance serves all users.
pub struct FormEngine {
    config: FormflowConfig,
    templates: Arc<dyn TemplateProvider>,
    store: Arc<dyn SessionStore>,
    evidence: Arc<dyn EvidenceValidator>,
    interpreter: Option<Arc<dyn AnswerInterpreter>>,
    risk: Option<Arc<dyn RiskEvaluator>>,
    sink: Option<Arc<dyn FinalizeSink>>,
    /// Per-user turn serialization. An entry is created on first contact and
    /// kept for the session's lifetime; the map stays small (one per user).
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FormEngine {
    pub fn new(
        config: FormflowConfig,
        templates: Arc<dyn TemplateProvider>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            templates,
            store,
            evidence: Arc::new(evidence::BasicEvidenceValidator),
            interpreter: None,
            risk: None,
            sink: None,
            locks: DashMap::new(),
        }
    }

    pub fn with_interpreter(mut self, interpreter: Arc<dyn AnswerInterpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    pub fn with_risk_evaluator(mut self, risk: Arc<dyn RiskEvaluator>) -> Self {
        self.risk = Some(risk);
        self
    }

    pub fn with_evidence_validator(mut self, evidence: Arc<dyn EvidenceValidator>) -> Self {
        self.evidence = evidence;
        self
    }

    pub fn with_finalize_sink(mut self, sink: Arc<dyn FinalizeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.config.engine.collaborator_timeout_secs)
    }

    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Process one inbound message end to end.
    ///
    /// Turns for the same user are serialized; concurrent deliveries queue on
    /// a per-user lock. Exactly one session save and one outbound event append
    /// happen per replied turn; absorbed duplicates touch nothing.
    pub async fn process(&self, inbound: InboundMessage) -> Result<TurnOutcome, FormflowError> {
        let lock = self.user_lock(&inbound.user_id);
        let _guard = lock.lock().await;

        let text = inbound.text.clone().unwrap_or_default();
        let trimmed = text.trim();

        // Resolve the template, honoring an explicit switch in this message.
        let mut form_code = inbound
            .form_code
            .clone()
            .unwrap_or_else(|| self.config.form.default_code.clone());
        let mut unknown_switch = None;
        if let Some(code) = command::extract_set_form(trimmed) {
            if self.templates.get_active_by_code(&code).await?.is_some() {
                form_code = code;
            } else {
                unknown_switch = Some(code);
            }
        }
        let template = match self.templates.get_active_by_code(&form_code).await? {
            Some(t) => t,
            None => {
                let available = self
                    .templates
                    .list_active()
                    .await?
                    .into_iter()
                    .map(|t| t.code)
                    .collect();
                return Err(FormflowError::TemplateNotFound {
                    code: form_code,
                    available,
                });
            }
        };

        let key = SessionKey::new(inbound.user_id.clone(), form_code.clone());

        // Duplicate suppression happens before anything is logged or mutated.
        if let Some(message_id) = inbound.message_id.as_deref() {
            if self.store.has_inbound(&key, message_id).await? {
                debug!(%key, message_id, "duplicate delivery absorbed");
                return Ok(TurnOutcome::absorbed());
            }
        }

        let mut session = self
            .store
            .get_or_create(&key, inbound.user_name.as_deref(), &inbound.channel)
            .await?;

        let mut in_event =
            EventRecord::inbound(inbound.message_id.clone(), inbound.text.clone());
        in_event.attachments = inbound.attachments.clone();
        self.store.append_event(&key, &in_event).await?;

        if let Some(topic) = command::detect_topic(trimmed, &self.config.engine.topic_keywords) {
            info!(%key, topic, "topic keyword detected");
            session.notes.detected_topic = Some(topic);
        }

        let turn = match unknown_switch {
            Some(code) => {
                let available = self.templates.list_active().await.unwrap_or_default();
                Turn::primary(
                    render::form_list(&available)
                        .preceded_by(&format!("I don't know a form called \"{code}\".")),
                )
            }
            None => self.run_turn(&template, &mut session, &inbound, trimmed).await,
        };

        self.store.save(&session).await?;
        let out_event = EventRecord::outbound(turn.rendered.text.clone(), turn.agent);
        self.store.append_event(&key, &out_event).await?;

        let reply = Reply {
            text: turn.rendered.text,
            buttons: turn.rendered.buttons,
            meta: ReplyMeta {
                session_status: session.status,
                current_qid: session.current_qid.clone(),
                current_block_id: session.current_block_id.clone(),
                form_code,
                user_id: inbound.user_id,
            },
        };
        Ok(TurnOutcome::with_actions(reply, turn.actions))
    }

    /// Mark the external step for a parked session as finished and resume the
    /// question flow. Called by the host when a block's external action
    /// completes out of band. Only sessions parked in `AwaitingExternal`
    /// react; any other state is left untouched.
    pub async fn resume_external(&self, key: &SessionKey) -> Result<(), FormflowError> {
        let lock = self.user_lock(&key.user_id);
        let _guard = lock.lock().await;
        let mut session = self.store.get_or_create(key, None, "system").await?;
        if session.status != SessionStatus::AwaitingExternal {
            debug!(key = %session.key, status = %session.status, "resume ignored, session not parked");
            return Ok(());
        }
        for progress in &mut session.block_statuses {
            progress.pending_action = None;
        }
        fsm::resume(&mut session);
        self.store.save(&session).await
    }

    async fn run_turn(
        &self,
        template: &FormTemplate,
        session: &mut Session,
        inbound: &InboundMessage,
        text: &str,
    ) -> Turn {
        if let Some(cmd) = command::parse_command(text) {
            return self.run_command(cmd, template, session).await;
        }

        match session.status {
            SessionStatus::AwaitingConsent => self.run_consent(template, session, text),
            SessionStatus::PendingReview => Turn {
                rendered: render::escalated(),
                actions: vec![Action::Handoff],
                agent: AgentRole::System,
            },
            SessionStatus::InProgress => self.run_question_flow(template, session, inbound, text).await,
            _ => Turn::primary(render::idle_menu(session)),
        }
    }

    async fn run_command(&self, cmd: Command, template: &FormTemplate, session: &mut Session) -> Turn {
        match cmd {
            Command::Restart | Command::StartForm | Command::SetForm(_) => {
                fsm::restart(session);
                session.consent_prompted = true;
                Turn::primary(render::consent_prompt(template, session.user_name.as_deref()))
            }
            Command::Back => {
                if fsm::back_one(session) {
                    self.present_next(template, session, "Okay, going back one question.")
                } else {
                    Turn::primary(Rendered::text("There is nothing to undo yet."))
                }
            }
            Command::Status => {
                let answered = template
                    .questions
                    .iter()
                    .filter(|q| resolver::is_answered(session, &q.qid))
                    .count();
                let visible = template
                    .questions
                    .iter()
                    .filter(|q| resolver::is_visible(q, session))
                    .count();
                let line = render::status_line(session, answered, visible);
                if session.status == SessionStatus::InProgress {
                    self.present_next(template, session, &line)
                } else {
                    Turn::primary(Rendered::text(line))
                }
            }
            Command::Handoff => {
                fsm::handoff(session);
                Turn {
                    rendered: render::handoff_notice(),
                    actions: vec![Action::Handoff],
                    agent: AgentRole::System,
                }
            }
            Command::Pause => {
                fsm::pause(session);
                Turn::primary(render::paused())
            }
            Command::Resume => {
                fsm::resume(session);
                self.present_next(template, session, "Resuming where we left off.")
            }
            Command::RequestReview => {
                fsm::escalate_review(session);
                Turn {
                    rendered: render::escalated(),
                    actions: vec![Action::Handoff],
                    agent: AgentRole::System,
                }
            }
            Command::BlockStatus => Turn::primary(render::block_status(template, session)),
            Command::FormList => {
                let templates = match self.templates.list_active().await {
                    Ok(list) => list,
                    Err(err) => {
                        warn!(error = %err, "template listing failed");
                        Vec::new()
                    }
                };
                Turn::primary(render::form_list(&templates))
            }
            Command::FormWeb => {
                let rendered = match &self.config.form.web_url {
                    Some(url) => Rendered::text(format!(
                        "You can also fill this form on the web: {url}"
                    )),
                    None => Rendered::text("This form is only available here for now."),
                };
                Turn::primary(rendered)
            }
            Command::Chat => {
                fsm::enter_free_chat(session);
                Turn::primary(render::chat_invitation())
            }
            Command::Summary => {
                Turn::primary(Rendered::text(render::summary_text(template, session)))
            }
            Command::DeleteData => {
                let purge_at =
                    Utc::now() + ChronoDuration::days(self.config.engine.purge_after_days);
                session.delete_requested_at = Some(Utc::now());
                session.delete_purge_at = Some(purge_at);
                if let Err(err) = self.store.request_deletion(&session.key, purge_at).await {
                    warn!(key = %session.key, error = %err, "deletion request failed to persist");
                }
                Turn::primary(render::deletion_scheduled(self.config.engine.purge_after_days))
            }
        }
    }

    fn run_consent(&self, template: &FormTemplate, session: &mut Session, text: &str) -> Turn {
        // Refusal is checked first so "no acepto" cannot read as acceptance.
        if command::is_negative(text) {
            fsm::consent_declined(session);
            return Turn::primary(render::consent_declined());
        }
        if command::is_affirmative(text) {
            fsm::consent_accepted(session);
            session.notes.free_chat = false;
            // Stale answers from a previous run restart the flow cleanly.
            if resolver::resolve_current(template, session).is_complete()
                && !template.questions.is_empty()
            {
                session.answers.clear();
                session.block_statuses.clear();
            }
            return self.present_next(template, session, "Great, let's begin.");
        }
        if session.notes.free_chat && !command::is_form_intent(text) {
            return Turn::primary(render::chat_invitation());
        }
        session.consent_prompted = true;
        Turn::primary(render::consent_prompt(template, session.user_name.as_deref()))
    }

    async fn run_question_flow(
        &self,
        template: &FormTemplate,
        session: &mut Session,
        inbound: &InboundMessage,
        text: &str,
    ) -> Turn {
        let resolution = resolver::resolve_current(template, session);
        let Some(question) = resolution.question else {
            return self.finish(template, session).await;
        };
        let question = question.clone();
        let block = resolution
            .block
            .unwrap_or_else(|| Block::new(question.block_id.clone()));

        session.current_qid = Some(question.qid.clone());
        session.current_block_id = Some(block.id.clone());

        // Pagination requests re-present the same question, no attempt spent.
        if let Some(token) = paging::parse_more_token(text) {
            if token.qid == question.qid && question.qtype.is_choice() {
                session.notes.option_pages.insert(question.qid.clone(), token.page);
                let paged = self.page(&question, session);
                return Turn::primary(render::question_prompt(&question, paged.as_ref()))
                    .attributed(question_agent(&question, &block));
            }
        }

        let input = MessageInput {
            text: Some(text),
            attachment_count: inbound.attachments.len(),
        };
        let valid = match validator::validate(&question, &input) {
            Ok(valid) => valid,
            Err(error) => {
                return self
                    .handle_invalid(template, session, &question, &block, inbound, text, error)
                    .await;
            }
        };

        self.accept_answer(template, session, &question, &block, inbound, text, valid)
            .await
    }

    /// Risk and evidence gates for a structurally valid answer, then the save
    /// and advance. Coerced choice input lands here as well and faces the
    /// same gates as directly valid input.
    async fn accept_answer(
        &self,
        template: &FormTemplate,
        session: &mut Session,
        question: &Question,
        block: &Block,
        inbound: &InboundMessage,
        text: &str,
        valid: validator::ValidAnswer,
    ) -> Turn {
        // Risk gate: a failing verdict escalates without saving the answer.
        if question.behavior.risk_check {
            if let Some(risk) = &self.risk {
                let candidate = answer_from(question, &valid, text);
                let verdict = tokio::time::timeout(
                    self.collaborator_timeout(),
                    risk.evaluate(session, question, &candidate),
                )
                .await;
                match verdict {
                    Ok(Ok(verdict)) if !verdict.ok => {
                        info!(key = %session.key, qid = %question.qid, reason = ?verdict.reason,
                            "risk check failed, escalating");
                        fsm::escalate_review(session);
                        session.block_progress_mut(&block.id).status =
                            BlockStatus::NeedsReview;
                        return Turn {
                            rendered: render::escalated(),
                            actions: vec![Action::Handoff],
                            agent: AgentRole::System,
                        };
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        warn!(qid = %question.qid, error = %err, "risk evaluator failed, letting answer pass")
                    }
                    Err(_) => {
                        warn!(qid = %question.qid, "risk evaluator timed out, letting answer pass")
                    }
                }
            }
        }

        // Attach files once the answer is structurally valid. Rolled back if
        // the evidence gate rejects them, so the question stays unanswered.
        let had_answer = session.answer(&question.qid).is_some();
        if !inbound.attachments.is_empty() {
            let evidence = inbound
                .attachments
                .iter()
                .cloned()
                .map(Into::into)
                .collect::<Vec<_>>();
            session.attach_evidence(&question.qid, evidence);
        }

        // Evidence gate: rejected files count as a failed attempt.
        if question.behavior.requires_evidence && !inbound.attachments.is_empty() {
            let attached = session
                .answer(&question.qid)
                .map(|a| a.evidence.clone())
                .unwrap_or_default();
            let verdict = tokio::time::timeout(
                self.collaborator_timeout(),
                self.evidence.validate(question, &attached, session),
            )
            .await;
            let verdict = match verdict {
                Ok(Ok(v)) => v,
                Ok(Err(err)) => {
                    warn!(qid = %question.qid, error = %err, "evidence validator failed");
                    EvidenceVerdict {
                        ok: false,
                        reason: Some("the files could not be checked".to_string()),
                    }
                }
                Err(_) => EvidenceVerdict {
                    ok: false,
                    reason: Some("the file check timed out".to_string()),
                },
            };
            if !verdict.ok {
                // Undo the attach so resolution still sees a pending question.
                let removed = inbound.attachments.len();
                if had_answer {
                    if let Some(answer) = session.answers.iter_mut().find(|a| a.qid == question.qid)
                    {
                        let keep = answer.evidence.len().saturating_sub(removed);
                        answer.evidence.truncate(keep);
                    }
                } else {
                    session.answers.retain(|a| a.qid != question.qid);
                }
                progress::record_failure(session, &block.id, self.config.engine.max_attempts);
                if session.status == SessionStatus::PendingReview {
                    return Turn {
                        rendered: render::escalated(),
                        actions: vec![Action::Handoff],
                        agent: AgentRole::System,
                    };
                }
                return Turn::primary(render::evidence_rejected(question, verdict.reason.as_deref()))
                    .attributed(AgentRole::Nurse);
            }
        }

        session.upsert_answer(answer_from(question, &valid, text));
        paging::clear_page(session, &question.qid);
        session.current_qid = None;

        self.advance(template, session, block).await
    }

    async fn handle_invalid(
        &self,
        template: &FormTemplate,
        session: &mut Session,
        question: &Question,
        block: &Block,
        inbound: &InboundMessage,
        text: &str,
        error: ValidationError,
    ) -> Turn {
        // Free-text coercion gets one chance before the failure counts.
        if error == ValidationError::InvalidOption && !text.is_empty() {
            let coerced = interpret::coerce_option(
                self.interpreter.as_deref(),
                question,
                text,
                self.collaborator_timeout(),
            )
            .await;
            if let Some(option) = coerced {
                let valid = validator::ValidAnswer {
                    value: Some(option.value),
                    label: Some(option.label),
                    raw: Some(text.to_string()),
                };
                return self
                    .accept_answer(template, session, question, block, inbound, text, valid)
                    .await;
            }
        }

        progress::record_failure(session, &block.id, self.config.engine.max_attempts);
        if session.status == SessionStatus::PendingReview {
            return Turn {
                rendered: render::escalated(),
                actions: vec![Action::Handoff],
                agent: AgentRole::System,
            };
        }
        let paged = self.page(question, session);
        Turn::primary(render::validation_error(question, error, paged.as_ref()))
            .attributed(question_agent(question, block))
    }

    /// After an accepted answer: close out the block if it has no pending
    /// questions left, fire its on-complete action, then present what's next.
    async fn advance(&self, template: &FormTemplate, session: &mut Session, block: &Block) -> Turn {
        let next = resolver::resolve_current(template, session);
        let block_finished = match (&next.question, &next.block) {
            (None, _) => true,
            (Some(_), Some(next_block)) => next_block.id != block.id,
            (Some(_), None) => true,
        };

        let mut prefix = String::new();
        let mut actions = Vec::new();
        if block_finished {
            progress::mark_done(session, &block.id);
            prefix = render::block_completed(block);
            if let Some(action) = &block.on_complete {
                progress::set_pending_action(session, &block.id, action.clone());
                actions.push(Action::CallApi(action.clone()));
            }
        }

        let next_qid = next.question.map(|q| q.qid.clone());
        let next_block = next.block.clone();
        match next_qid {
            None => {
                let mut turn = self.finish(template, session).await;
                turn.actions.extend(actions);
                if !prefix.is_empty() {
                    turn.rendered = turn.rendered.preceded_by(&prefix);
                }
                turn
            }
            Some(qid) => {
                if session.status == SessionStatus::AwaitingExternal {
                    // The on-complete action parked the session; the next
                    // question waits until the external step resolves.
                    let rendered = render::idle_menu(session);
                    return Turn {
                        rendered: rendered.preceded_by(&prefix),
                        actions,
                        agent: AgentRole::Nurse,
                    };
                }
                let question = template
                    .question(&qid)
                    .cloned()
                    .unwrap_or_else(|| Question::new(qid.clone(), "", QuestionType::Text));
                let block = next_block.unwrap_or_else(|| Block::new(question.block_id.clone()));
                session.current_qid = Some(question.qid.clone());
                session.current_block_id = Some(block.id.clone());
                let mut intro = prefix;
                if block_finished {
                    if !intro.is_empty() {
                        intro.push_str("\n\n");
                    }
                    intro.push_str(&render::block_intro(&block));
                }
                let paged = self.page(&question, session);
                let rendered =
                    render::question_prompt(&question, paged.as_ref()).preceded_by(&intro);
                Turn {
                    rendered,
                    actions,
                    agent: question_agent(&question, &block),
                }
            }
        }
    }

    /// Every visible question answered: complete the session and notify the
    /// finalize sink. Sink failures are logged, never surfaced to the user.
    async fn finish(&self, template: &FormTemplate, session: &mut Session) -> Turn {
        for block in template.build_blocks() {
            if session
                .block_progress(&block.id)
                .is_none_or(|p| p.status != BlockStatus::Done)
            {
                progress::mark_done(session, &block.id);
            }
        }
        fsm::complete(session);
        info!(key = %session.key, "form completed");

        if let Some(sink) = &self.sink {
            let payload = FinalizePayload {
                user_id: session.key.user_id.clone(),
                form_code: session.key.form_code.clone(),
                status: session.status,
                answers: session.answers.clone(),
                block_statuses: session.block_statuses.clone(),
                completed_at: Utc::now(),
            };
            if let Err(err) = sink.finalize(&payload).await {
                warn!(key = %session.key, error = %err, "finalize delivery failed");
            }
        }

        let summary = self
            .config
            .engine
            .summary_on_complete
            .then(|| render::summary_text(template, session));
        Turn::primary(render::completed(template, summary.as_deref()))
    }

    /// Render-time pagination state for a question, if its list is long.
    fn page(&self, question: &Question, session: &Session) -> Option<paging::PagedOptions> {
        paging::page_options(
            question,
            session,
            self.config.engine.max_list_rows,
            self.config.engine.page_size,
        )
    }

    /// Present the current question (or the completion state) after a
    /// command, prefixed with a context line.
    fn present_next(&self, template: &FormTemplate, session: &mut Session, prefix: &str) -> Turn {
        let resolution = resolver::resolve_current(template, session);
        match resolution.question {
            Some(question) => {
                let question = question.clone();
                let block = resolution
                    .block
                    .unwrap_or_else(|| Block::new(question.block_id.clone()));
                session.current_qid = Some(question.qid.clone());
                session.current_block_id = Some(block.id.clone());
                let paged = self.page(&question, session);
                Turn::primary(
                    render::question_prompt(&question, paged.as_ref()).preceded_by(prefix),
                )
                .attributed(question_agent(&question, &block))
            }
            None => Turn::primary(
                Rendered::text("All questions are answered already.").preceded_by(prefix),
            ),
        }
    }
}

/// Agent attributed to replies about a question: explicit per-question
/// override first, then block-name heuristics.
fn question_agent(question: &Question, block: &Block) -> AgentRole {
    if let Some(agent) = question.behavior.agent {
        return agent;
    }
    let folded = block.id.to_lowercase();
    if folded.contains("medic") || folded.contains("clinic") {
        AgentRole::Medic
    } else if folded.contains("evidence") || folded.contains("document") {
        AgentRole::Nurse
    } else {
        AgentRole::Primary
    }
}

fn answer_from(question: &Question, valid: &validator::ValidAnswer, raw: &str) -> Answer {
    let mut answer = Answer::new(question.qid.clone(), valid.value.clone());
    answer.label = valid.label.clone();
    answer.raw = valid.raw.clone().or_else(|| {
        (!raw.is_empty() && valid.value.as_deref() != Some(raw)).then(|| raw.to_string())
    });
    answer
}

/// Internal per-turn accumulation before reply assembly.
struct Turn {
    rendered: Rendered,
    actions: Vec<Action>,
    agent: AgentRole,
}

impl Turn {
    fn primary(rendered: Rendered) -> Self {
        Self {
            rendered,
            actions: Vec::new(),
            agent: AgentRole::Primary,
        }
    }

    fn attributed(mut self, agent: AgentRole) -> Self {
        self.agent = agent;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_agent_prefers_explicit_override() {
        let mut q = Question::new("q1", "Q?", QuestionType::Text);
        q.behavior.agent = Some(AgentRole::Specialist);
        let block = Block::new("medical-history");
        assert_eq!(question_agent(&q, &block), AgentRole::Specialist);
        q.behavior.agent = None;
        assert_eq!(question_agent(&q, &block), AgentRole::Medic);
        assert_eq!(question_agent(&q, &Block::new("default")), AgentRole::Primary);
    }
}
