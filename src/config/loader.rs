//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::RouterConfig;
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
pub fn parse_config(content: &str) -> Result<RouterConfig, ConfigError> {
    let config: RouterConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<RouterConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Strategy;

    const SAMPLE: &str = r#"
[listener]
bind_address = "127.0.0.1:8080"

[defaults]
failure_threshold = 4

[[services]]
name = "users"
targets = ["127.0.0.1:3001", "127.0.0.1:3002"]
strategy = "least-connections"
path_prefix = "/api/users"

[services.circuit_breaker]
failure_threshold = 2
reset_timeout_ms = 5000

[services.response_headers]
x-served-by = "service-router"

[[services]]
name = "orders"
targets = ["127.0.0.1:3003"]
"#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.defaults.failure_threshold, 4);
        assert_eq!(config.defaults.reset_timeout_ms, 30_000);
        assert_eq!(config.services.len(), 2);

        let users = &config.services[0];
        assert_eq!(users.mount_prefix(), "/api/users");
        assert_eq!(users.options.strategy, Some(Strategy::LeastConnections));
        let cb = users.options.circuit_breaker.as_ref().unwrap();
        assert_eq!(cb.failure_threshold, Some(2));
        assert_eq!(cb.reset_timeout_ms, Some(5000));
        assert_eq!(cb.half_open_success_threshold, None);
        assert_eq!(
            users.options.response_headers.get("x-served-by").map(String::as_str),
            Some("service-router")
        );

        let orders = &config.services[1];
        assert_eq!(orders.mount_prefix(), "/orders");
        assert_eq!(orders.options.strategy, None);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, RouterConfig::default());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("[[services]"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config("[[services]]\nname = \"x\"\ntargets = []\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("services[0].targets"));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let err = parse_config(
            r#"
[defaults]
request_timeout_ms = 0
reset_timeout_ms = 0

[[services]]
name = "users"
targets = ["127.0.0.1:3001"]

[services.circuit_breaker]
request_timeout_ms = 0
"#,
        )
        .unwrap_err();
        let ConfigError::Validation(errors) = err else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"defaults.request_timeout_ms"));
        assert!(fields.contains(&"defaults.reset_timeout_ms"));
        assert!(fields.contains(&"services[0].options"));
    }

    #[test]
    fn test_validation_message_joins_every_error() {
        let err = parse_config(
            "[defaults]\nfailure_threshold = 0\n\n[[services]]\nname = \"x\"\ntargets = []\n",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("defaults.failure_threshold: must be greater than 0"));
        assert!(message.contains(", services[0].targets: "));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
