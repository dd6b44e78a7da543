//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, RISK_LEVEL_NAMES, STORAGE_BACKENDS};

/// Validate a fully merged configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_assistant(config)?;
    validate_trust(config)?;
    validate_functions(config)?;
    validate_storage(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn check_risk_name(field: &str, value: &str) -> ConfigResult<()> {
    if RISK_LEVEL_NAMES.contains(&value.trim().to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(invalid(
            field,
            format!(
                "unknown risk level '{value}'; expected one of: {}",
                RISK_LEVEL_NAMES.join(", ")
            ),
        ))
    }
}

fn validate_assistant(config: &Config) -> ConfigResult<()> {
    if config.assistant.proposal_ttl_secs == 0 {
        return Err(invalid(
            "assistant.proposal_ttl_secs",
            "must be at least 1 second",
        ));
    }
    if config.assistant.undo_window_secs == 0 {
        return Err(invalid(
            "assistant.undo_window_secs",
            "must be at least 1 second",
        ));
    }
    Ok(())
}

fn validate_trust(config: &Config) -> ConfigResult<()> {
    let t = &config.trust;
    check_risk_name("trust.auto_approve_threshold", &t.auto_approve_threshold)?;
    if t.max_actions_per_window == 0 {
        return Err(invalid(
            "trust.max_actions_per_window",
            "must be at least 1",
        ));
    }
    if t.window_seconds == 0 {
        return Err(invalid("trust.window_seconds", "must be at least 1 second"));
    }
    Ok(())
}

fn validate_functions(config: &Config) -> ConfigResult<()> {
    for (name, section) in &config.functions {
        if name.trim().is_empty() {
            return Err(invalid("functions", "function name must not be empty"));
        }
        if let Some(level) = &section.risk_level {
            check_risk_name(&format!("functions.{name}.risk_level"), level)?;
        }
        if let Some(level) = &section.requires_confirmation_above {
            check_risk_name(
                &format!("functions.{name}.requires_confirmation_above"),
                level,
            )?;
        }
    }
    Ok(())
}

fn validate_storage(config: &Config) -> ConfigResult<()> {
    let s = &config.storage;
    if !STORAGE_BACKENDS.contains(&s.backend.as_str()) {
        return Err(invalid(
            "storage.backend",
            format!(
                "unsupported backend '{}'; expected one of: {}",
                s.backend,
                STORAGE_BACKENDS.join(", ")
            ),
        ));
    }
    if s.path.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(invalid("storage.path", "must not be empty when set"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "invalid log level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json" | "full") {
        return Err(invalid(
            "logging.format",
            format!(
                "invalid log format '{}'; expected one of: pretty, compact, json, full",
                l.format
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FunctionOverrideSection;

    #[test]
    fn test_default_config_is_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_rejects_zero_rate_window() {
        let mut config = Config::default();
        config.trust.max_actions_per_window = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ValidationError { ref field, .. }
                if field == "trust.max_actions_per_window"
        ));
    }

    #[test]
    fn test_rejects_unknown_threshold() {
        let mut config = Config::default();
        config.trust.auto_approve_threshold = "extreme".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_accepts_mixed_case_threshold() {
        let mut config = Config::default();
        config.trust.auto_approve_threshold = "Medium".into();
        validate(&config).unwrap();
    }

    #[test]
    fn test_rejects_bad_function_override() {
        let mut config = Config::default();
        config.functions.insert(
            "delete_recipe".into(),
            FunctionOverrideSection {
                risk_level: Some("severe".into()),
                ..Default::default()
            },
        );
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains("functions.delete_recipe.risk_level"));
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let mut config = Config::default();
        config.storage.backend = "postgres".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_rejects_bad_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(validate(&config).is_err());
    }
}
