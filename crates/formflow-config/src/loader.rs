// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./formflow.toml` > `~/.config/formflow/formflow.toml`
//! > `/etc/formflow/formflow.toml` with environment variable overrides via
//! `FORMFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::FormflowConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/formflow/formflow.toml` (system-wide)
/// 3. `~/.config/formflow/formflow.toml` (user XDG config)
/// 4. `./formflow.toml` (local directory)
/// 5. `FORMFLOW_*` environment variables
pub fn load_config() -> Result<FormflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FormflowConfig::default()))
        .merge(Toml::file("/etc/formflow/formflow.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("formflow/formflow.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("formflow.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<FormflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FormflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<FormflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(FormflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `FORMFLOW_ENGINE_MAX_ATTEMPTS` must map to
/// `engine.max_attempts`, not `engine.max.attempts`.
fn env_provider() -> Env {
    Env::prefixed("FORMFLOW_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("form_", "form.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("finalize_", "finalize.", 1)
            .replacen("finalize.api.key", "finalize.api_key", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_from_str_merges_over_defaults() {
        let config = load_config_from_str(
            r#"
[engine]
max_attempts = 5
topic_keywords = ["cancer", "diabetes"]
"#,
        )
        .unwrap();
        assert_eq!(config.engine.max_attempts, 5);
        assert_eq!(config.engine.topic_keywords.len(), 2);
        // Untouched sections keep defaults.
        assert_eq!(config.form.default_code, "intake");
    }

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.max_attempts, 3);
        assert_eq!(config.storage.database_path, "formflow.db");
    }
}
