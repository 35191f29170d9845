// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Formflow engine.

use thiserror::Error;

/// The primary error type used across all Formflow traits and core operations.
#[derive(Debug, Error)]
pub enum FormflowError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No active form template exists for the requested code.
    ///
    /// Carries the codes of templates that are active so callers can surface
    /// them to the user instead of silently substituting a default.
    #[error("no active form template with code '{code}'")]
    TemplateNotFound { code: String, available: Vec<String> },

    /// Template authoring errors (duplicate qid, forward-referencing visibility condition).
    #[error("invalid form template: {0}")]
    Template(String),

    /// Answer interpreter errors (API failure, malformed response).
    #[error("interpreter error: {message}")]
    Interpreter {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Finalize/action sink errors (endpoint unreachable, non-2xx response).
    #[error("sink error: {message}")]
    Sink {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
