// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for the Formflow engine.
//!
//! In-memory implementations of the persistence traits plus scriptable mock
//! collaborators and a fluent template builder. Everything here is for tests;
//! panicking on poisoned state is acceptable.

mod memory_store;
mod mocks;
mod template_builder;

pub use memory_store::MemorySessionStore;
pub use mocks::{
    MockEvidenceValidator, MockInterpreter, MockRiskEvaluator, RecordingSink,
    StaticTemplateProvider,
};
pub use template_builder::TemplateBuilder;
