// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Formflow engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Formflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormflowConfig {
    /// Engine behavior: attempt ceiling, pagination, collaborator timeouts.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Form selection defaults.
    #[serde(default)]
    pub form: FormConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Finalize webhook settings.
    #[serde(default)]
    pub finalize: FinalizeConfig,
}

/// Engine behavior configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Validation failures allowed per block before escalating to review.
    /// Template-wide; must be at least 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Maximum rows a channel can render in one option list.
    #[serde(default = "default_max_list_rows")]
    pub max_list_rows: usize,

    /// Real options per page; one row is reserved for the "more" sentinel.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Timeout for answer interpreter / risk / evidence collaborator calls.
    #[serde(default = "default_collaborator_timeout_secs")]
    pub collaborator_timeout_secs: u64,

    /// Include the answer summary in the completion reply.
    #[serde(default)]
    pub summary_on_complete: bool,

    /// Keywords remembered as a detected topic when they appear in free text.
    #[serde(default)]
    pub topic_keywords: Vec<String>,

    /// Days between a deletion request and the scheduled purge.
    #[serde(default = "default_purge_after_days")]
    pub purge_after_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_list_rows: default_max_list_rows(),
            page_size: default_page_size(),
            collaborator_timeout_secs: default_collaborator_timeout_secs(),
            summary_on_complete: false,
            topic_keywords: Vec::new(),
            purge_after_days: default_purge_after_days(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_list_rows() -> usize {
    10
}

fn default_page_size() -> usize {
    9
}

fn default_collaborator_timeout_secs() -> u64 {
    10
}

fn default_purge_after_days() -> i64 {
    15
}

/// Form selection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FormConfig {
    /// Form code used when the inbound message does not name one.
    #[serde(default = "default_form_code")]
    pub default_code: String,

    /// Public URL of the web variant of the form, offered as an alternative.
    #[serde(default)]
    pub web_url: Option<String>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            default_code: default_form_code(),
            web_url: None,
        }
    }
}

fn default_form_code() -> String {
    "intake".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable write-ahead logging.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    "formflow.db".to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// Finalize webhook configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FinalizeConfig {
    /// Endpoint receiving completed-session payloads. `None` disables delivery.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key sent as `x-api-key` when set.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = FormflowConfig::default();
        assert_eq!(config.engine.max_attempts, 3);
        assert_eq!(config.engine.max_list_rows, 10);
        assert_eq!(config.engine.page_size, 9);
        assert_eq!(config.engine.purge_after_days, 15);
        assert_eq!(config.form.default_code, "intake");
        assert!(config.storage.wal_mode);
        assert!(config.finalize.endpoint.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let toml_str = r#"
[engine]
max_attempts = 5
not_a_key = true
"#;
        let result = toml::from_str::<FormflowConfig>(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let toml_str = r#"
[form]
default_code = "survey"

[finalize]
endpoint = "https://example.com/hook"
"#;
        let config: FormflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.form.default_code, "survey");
        assert_eq!(config.engine.max_attempts, 3);
        assert_eq!(
            config.finalize.endpoint.as_deref(),
            Some("https://example.com/hook")
        );
    }
}
