// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable mock collaborators.
//!
//! Each mock is configured up front with canned responses and records what it
//! was called with, following the inject/capture pattern used across the
//! engine's integration tests.

use std::sync::Mutex;

use async_trait::async_trait;

use formflow_core::error::FormflowError;
use formflow_core::traits::{
    AnswerInterpreter, EvidenceValidator, FinalizeSink, RiskEvaluator, TemplateProvider,
};
use formflow_core::types::{
    ActionDescriptor, Answer, CoercedOption, Evidence, EvidenceVerdict, FinalizePayload,
    FormTemplate, Question, RiskVerdict, Session,
};

/// Serves a fixed set of templates.
#[derive(Default)]
pub struct StaticTemplateProvider {
    templates: Vec<FormTemplate>,
}

impl StaticTemplateProvider {
    pub fn new(templates: Vec<FormTemplate>) -> Self {
        Self { templates }
    }

    pub fn single(template: FormTemplate) -> Self {
        Self::new(vec![template])
    }
}

#[async_trait]
impl TemplateProvider for StaticTemplateProvider {
    async fn get_active_by_code(
        &self,
        code: &str,
    ) -> Result<Option<FormTemplate>, FormflowError> {
        Ok(self
            .templates
            .iter()
            .find(|t| t.code == code && t.is_active)
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<FormTemplate>, FormflowError> {
        Ok(self.templates.iter().filter(|t| t.is_active).cloned().collect())
    }
}

/// Returns a scripted coercion result and records the raw inputs it saw.
#[derive(Default)]
pub struct MockInterpreter {
    result: Option<CoercedOption>,
    fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl MockInterpreter {
    pub fn returning(result: Option<CoercedOption>) -> Self {
        Self {
            result,
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// An interpreter whose every call errors.
    pub fn failing() -> Self {
        Self {
            result: None,
            fail: true,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl AnswerInterpreter for MockInterpreter {
    async fn coerce_option(
        &self,
        _question: &Question,
        raw: &str,
    ) -> Result<Option<CoercedOption>, FormflowError> {
        self.calls.lock().unwrap().push(raw.to_string());
        if self.fail {
            return Err(FormflowError::Interpreter {
                message: "mock interpreter failure".to_string(),
                source: None,
            });
        }
        Ok(self.result.clone())
    }
}

/// Returns a scripted risk verdict and records evaluated (qid, value) pairs.
pub struct MockRiskEvaluator {
    verdict: RiskVerdict,
    pub calls: Mutex<Vec<(String, Option<String>)>>,
}

impl MockRiskEvaluator {
    pub fn passing() -> Self {
        Self::verdict(RiskVerdict { ok: true, reason: None })
    }

    pub fn flagging(reason: &str) -> Self {
        Self::verdict(RiskVerdict {
            ok: false,
            reason: Some(reason.to_string()),
        })
    }

    pub fn verdict(verdict: RiskVerdict) -> Self {
        Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl RiskEvaluator for MockRiskEvaluator {
    async fn evaluate(
        &self,
        _session: &Session,
        question: &Question,
        answer: &Answer,
    ) -> Result<RiskVerdict, FormflowError> {
        self.calls
            .lock()
            .unwrap()
            .push((question.qid.clone(), answer.value.clone()));
        Ok(self.verdict.clone())
    }
}

/// Returns a scripted evidence verdict.
pub struct MockEvidenceValidator {
    verdict: EvidenceVerdict,
    pub calls: Mutex<Vec<usize>>,
}

impl MockEvidenceValidator {
    pub fn passing() -> Self {
        Self::verdict(EvidenceVerdict { ok: true, reason: None })
    }

    pub fn rejecting(reason: &str) -> Self {
        Self::verdict(EvidenceVerdict {
            ok: false,
            reason: Some(reason.to_string()),
        })
    }

    pub fn verdict(verdict: EvidenceVerdict) -> Self {
        Self {
            verdict,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EvidenceValidator for MockEvidenceValidator {
    async fn validate(
        &self,
        _question: &Question,
        evidence: &[Evidence],
        _session: &Session,
    ) -> Result<EvidenceVerdict, FormflowError> {
        self.calls.lock().unwrap().push(evidence.len());
        Ok(self.verdict.clone())
    }
}

/// Captures every finalize payload and delivered action.
#[derive(Default)]
pub struct RecordingSink {
    pub finalized: Mutex<Vec<FinalizePayload>>,
    pub actions: Mutex<Vec<ActionDescriptor>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FinalizeSink for RecordingSink {
    async fn finalize(&self, payload: &FinalizePayload) -> Result<(), FormflowError> {
        self.finalized.lock().unwrap().push(payload.clone());
        Ok(())
    }

    async fn deliver_action(&self, action: &ActionDescriptor) -> Result<(), FormflowError> {
        self.actions.lock().unwrap().push(action.clone());
        Ok(())
    }
}
