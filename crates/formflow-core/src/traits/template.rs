// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Template provider trait for form template lookup.

use async_trait::async_trait;

use crate::error::FormflowError;
use crate::types::FormTemplate;

/// Supplies active form templates by code.
///
/// A template is immutable per version; providers return the highest active
/// version for a code.
#[async_trait]
pub trait TemplateProvider: Send + Sync {
    /// The active template for `code`, or `None` if no active version exists.
    async fn get_active_by_code(&self, code: &str)
        -> Result<Option<FormTemplate>, FormflowError>;

    /// All active templates, for listing and code suggestions.
    async fn list_active(&self) -> Result<Vec<FormTemplate>, FormflowError>;
}
