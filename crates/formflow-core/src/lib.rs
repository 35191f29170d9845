// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Formflow conversational-form engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Formflow workspace: form templates,
//! sessions, answers, block progress, and the collaborator seams the engine
//! depends on (template provider, session store, answer interpreter, risk and
//! evidence evaluators, finalize sink).

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FormflowError;
pub use types::{Session, SessionKey, SessionStatus};

// Re-export all collaborator traits at crate root.
pub use traits::{
    AnswerInterpreter, EvidenceValidator, FinalizeSink, RiskEvaluator, SessionStore,
    TemplateProvider,
};
