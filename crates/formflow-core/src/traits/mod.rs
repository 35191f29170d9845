// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions.
//!
//! The engine only ever talks to its collaborators through these seams:
//! templates, session persistence, AI answer interpretation, risk and evidence
//! evaluation, and outbound finalize/action delivery.

pub mod evidence;
pub mod interpreter;
pub mod risk;
pub mod sink;
pub mod store;
pub mod template;

pub use evidence::EvidenceValidator;
pub use interpreter::AnswerInterpreter;
pub use risk::RiskEvaluator;
pub use sink::FinalizeSink;
pub use store::SessionStore;
pub use template::TemplateProvider;
