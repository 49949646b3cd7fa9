//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::ApiConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ApiConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Replace the listener bind address and validate the result.
pub fn override_bind_address(mut config: ApiConfig, bind: String) -> Result<ApiConfig, ConfigError> {
    config.listener.bind_address = bind;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse and validate a TOML document.
pub fn parse_config(content: &str) -> Result<ApiConfig, ConfigError> {
    let config: ApiConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_document() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [session]
            header_name = "X-Session"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.session.header_name, "X-Session");
        assert_eq!(config.session.param_name, "sessionToken");
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[listener\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_error_lists_fields() {
        let err = parse_config("[timeouts]\nrequest_secs = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("timeouts.request_secs"));
    }

    #[test]
    fn test_bind_override_is_validated() {
        let config = override_bind_address(ApiConfig::default(), "127.0.0.1:7070".into()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:7070");

        let err = override_bind_address(ApiConfig::default(), "localhost".into()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors[0].field == "listener.bind_address"));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join(format!("insights-{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(load_config(&path), Err(ConfigError::Io(_))));
    }
}
