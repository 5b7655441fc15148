//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dependency_table() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[dependencies]]
            name = "weather"
            base_url = "http://127.0.0.1:7000"
            path = "/forecast/{city}"
            params = { city = "oslo" }
            extract_field = "summary"
            output_field = "forecast"
            fallback = "n/a"

            [dependencies.breaker]
            max_failures = 1
            call_timeout_ms = 250
            reset_timeout_ms = 1000
            "#,
        )
        .unwrap();

        assert_eq!(config.dependencies.len(), 1);
        let dep = &config.dependencies[0];
        assert_eq!(dep.name, "weather");
        assert_eq!(dep.params.get("city").map(String::as_str), Some("oslo"));
        assert_eq!(dep.breaker.as_ref().map(|b| b.max_failures), Some(1));
    }

    #[test]
    fn rejects_invalid_values() {
        let err = parse_config(
            r#"
            [upstream]
            connect_timeout_ms = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("upstream.connect_timeout_ms"));
    }

    #[test]
    fn reports_syntax_errors() {
        let err = parse_config("[listener").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
