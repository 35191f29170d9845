// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as positive attempt ceilings and coherent pagination.

use crate::diagnostic::ConfigError;
use crate::model::FormflowConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &FormflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.engine.max_attempts < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.max_attempts must be at least 1, got {}",
                config.engine.max_attempts
            ),
        });
    }

    if config.engine.page_size < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.page_size must be at least 1, got {}",
                config.engine.page_size
            ),
        });
    }

    // One row must remain for the "more" sentinel.
    if config.engine.page_size >= config.engine.max_list_rows {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.page_size ({}) must be smaller than engine.max_list_rows ({})",
                config.engine.page_size, config.engine.max_list_rows
            ),
        });
    }

    if config.engine.collaborator_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.collaborator_timeout_secs must be positive".to_string(),
        });
    }

    if config.engine.purge_after_days < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "engine.purge_after_days must be at least 1, got {}",
                config.engine.purge_after_days
            ),
        });
    }

    if config.form.default_code.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "form.default_code must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = FormflowConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn zero_max_attempts_fails_validation() {
        let mut config = FormflowConfig::default();
        config.engine.max_attempts = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("max_attempts"))
        ));
    }

    #[test]
    fn page_size_must_leave_room_for_sentinel() {
        let mut config = FormflowConfig::default();
        config.engine.page_size = 10;
        config.engine.max_list_rows = 10;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("page_size"))
        ));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = FormflowConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }
}
