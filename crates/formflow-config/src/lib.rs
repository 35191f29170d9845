// SPDX-FileCopyrightText: 2026 Formflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Formflow engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering.
//!
//! # Usage
//!
//! ```no_run
//! use formflow_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("default form: {}", config.form.default_code);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::FormflowConfig;

/// Load configuration from the XDG hierarchy and validate it.
pub fn load_and_validate() -> Result<FormflowConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse {
            message: err.to_string(),
        }]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<FormflowConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError::Parse {
            message: err.to_string(),
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_inline_config_loads() {
        let config = load_and_validate_str(
            r#"
[engine]
max_attempts = 2

[form]
default_code = "survey"
"#,
        )
        .unwrap();
        assert_eq!(config.engine.max_attempts, 2);
        assert_eq!(config.form.default_code, "survey");
    }

    #[test]
    fn invalid_values_surface_diagnostics() {
        let errors = load_and_validate_str(
            r#"
[engine]
max_attempts = 0
"#,
        )
        .unwrap_err();
        assert!(!errors.is_empty());
        assert!(render_errors(&errors).contains("max_attempts"));
    }

    #[test]
    fn parse_errors_surface_diagnostics() {
        let errors = load_and_validate_str("not valid toml [[").unwrap_err();
        assert!(matches!(errors[0], ConfigError::Parse { .. }));
    }
}
