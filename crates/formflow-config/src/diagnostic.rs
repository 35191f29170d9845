// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diagnostic error types rendered through miette.

use miette::Diagnostic;
use thiserror::Error;

/// A configuration error suitable for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// TOML/env deserialization failed.
    #[error("failed to parse configuration: {message}")]
    #[diagnostic(code(formflow::config::parse))]
    Parse { message: String },

    /// A value failed post-deserialization validation.
    #[error("{message}")]
    #[diagnostic(code(formflow::config::validation))]
    Validation { message: String },
}

/// Render a list of config errors into a single displayable report string.
pub fn render_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(|e| format!("{e}"))
        .collect::<Vec<_>>()
        .join("\n")
}
