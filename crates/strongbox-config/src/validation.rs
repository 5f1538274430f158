// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every violation instead of failing on the first one.

use crate::diagnostic::ConfigError;
use crate::model::StrongboxConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &StrongboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: String| {
        errors.push(ConfigError::Validation {
            field: field.to_string(),
            message,
        });
    };

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path", "must not be empty".into());
    }

    if config.storage.operation_timeout_ms == 0 {
        fail(
            "storage.operation_timeout_ms",
            "must be greater than zero".into(),
        );
    }

    if config.storage.busy_timeout_ms > config.storage.operation_timeout_ms {
        fail(
            "storage.busy_timeout_ms",
            format!(
                "must not exceed storage.operation_timeout_ms ({})",
                config.storage.operation_timeout_ms
            ),
        );
    }

    if config.keystore.key_file.trim().is_empty() {
        fail("keystore.key_file", "must not be empty".into());
    }

    // Argon2id floors (OWASP minimums).
    if config.kdf.memory_cost < 32768 {
        fail(
            "kdf.memory_cost",
            format!(
                "must be at least 32768 (32 MiB), got {}",
                config.kdf.memory_cost
            ),
        );
    }

    if config.kdf.iterations < 2 {
        fail(
            "kdf.iterations",
            format!("must be at least 2, got {}", config.kdf.iterations),
        );
    }

    if config.kdf.parallelism < 1 {
        fail(
            "kdf.parallelism",
            format!("must be at least 1, got {}", config.kdf.parallelism),
        );
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        fail(
            "logging.level",
            format!(
                "`{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        );
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

    fn has_field(errors: &[ConfigError], wanted: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { field, .. } if field == wanted))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&StrongboxConfig::default()).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = StrongboxConfig::default();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_field(&errors, "storage.database_path"));
    }

    #[test]
    fn weak_kdf_parameters_fail_validation() {
        let mut config = StrongboxConfig::default();
        config.kdf.memory_cost = 1024;
        config.kdf.iterations = 1;
        config.kdf.parallelism = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(has_field(&errors, "kdf.memory_cost"));
        assert!(has_field(&errors, "kdf.iterations"));
        assert!(has_field(&errors, "kdf.parallelism"));
    }

    #[test]
    fn busy_timeout_must_fit_in_operation_timeout() {
        let mut config = StrongboxConfig::default();
        config.storage.busy_timeout_ms = 20_000;
        config.storage.operation_timeout_ms = 1_000;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_field(&errors, "storage.busy_timeout_ms"));
    }

    #[test]
    fn zero_operation_timeout_is_rejected() {
        let mut config = StrongboxConfig::default();
        config.storage.busy_timeout_ms = 0;
        config.storage.operation_timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_field(&errors, "storage.operation_timeout_ms"));
    }

    #[test]
    fn log_level_is_case_insensitive() {
        let mut config = StrongboxConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(validate_config(&config).is_ok());

        config.logging.level = "verbose".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_field(&errors, "logging.level"));
    }
}
