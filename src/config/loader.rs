//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::TelemetryConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<TelemetryConfig, ConfigError> {
    let config: TelemetryConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<TelemetryConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::LogFormat;

    #[test]
    fn test_parse_full_config() {
        let config = parse_config(
            r#"
            app_name = "orders"

            [log]
            level = "debug"
            format = "text"

            [correlation]
            header = "X-Request-Id"
            mint_missing = true

            [redaction]
            cookie_blacklist = ["session", "user_id"]
            anonymized_query_params = ["token"]

            [middleware]
            panic_status = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.app_name, "orders");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Text);
        assert_eq!(config.correlation.header, "X-Request-Id");
        assert_eq!(config.correlation.user_header, "x-user-correlation-id");
        assert!(config.correlation.mint_missing);
        assert_eq!(config.redaction.cookie_blacklist, vec!["session", "user_id"]);
        assert_eq!(config.redaction.anonymized_query_params, vec!["token"]);
        assert_eq!(config.middleware.panic_status, 500);
        assert_eq!(config.timeouts.request_secs, 30);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.log.level, "info");
        assert_eq!(config.middleware.panic_status, 0);
        assert!(config.redaction.cookie_blacklist.is_empty());
    }

    #[test]
    fn test_invalid_level_is_reported() {
        let err = parse_config("[log]\nlevel = \"chatty\"").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().contains("log.level"));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let err = parse_config("[log\nlevel = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
