//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate service definitions (names, targets, options)
//! - Validate value ranges (thresholds and timeouts > 0, addresses parse)
//! - Detect conflicting mounts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::RouterConfig;
use crate::load_balancer::Target;
use crate::routing::PathPrefixMatcher;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a parsed configuration, collecting every error.
pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.admin.enabled && config.admin.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "admin.bind_address",
            format!("'{}' is not a socket address", config.admin.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }
    if !config.health.path.starts_with('/') {
        errors.push(ValidationError::new("health.path", "must start with '/'"));
    }

    let defaults = &config.defaults;
    if defaults.failure_threshold == 0 {
        errors.push(ValidationError::new("defaults.failure_threshold", "must be greater than 0"));
    }
    if defaults.half_open_success_threshold == 0 {
        errors.push(ValidationError::new(
            "defaults.half_open_success_threshold",
            "must be greater than 0",
        ));
    }
    if defaults.reset_timeout_ms == 0 {
        errors.push(ValidationError::new("defaults.reset_timeout_ms", "must be greater than 0"));
    }
    if defaults.request_timeout_ms == 0 {
        errors.push(ValidationError::new("defaults.request_timeout_ms", "must be greater than 0"));
    }

    let mut names = HashSet::new();
    let mut prefixes = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        let field = |suffix: &str| format!("services[{}].{}", i, suffix);

        if service.name.trim().is_empty() {
            errors.push(ValidationError::new(field("name"), "must not be empty"));
        } else if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::new(
                field("name"),
                format!("duplicate service name '{}'", service.name),
            ));
        }

        if service.targets.is_empty() {
            errors.push(ValidationError::new(field("targets"), "must not be empty"));
        }
        let mut seen = HashSet::new();
        for raw in &service.targets {
            match Target::parse(raw) {
                Ok(target) => {
                    if !seen.insert(target) {
                        errors.push(ValidationError::new(
                            field("targets"),
                            format!("duplicate target '{}'", raw),
                        ));
                    }
                }
                Err(e) => errors.push(ValidationError::new(field("targets"), e.to_string())),
            }
        }

        if let Some(prefix) = &service.path_prefix {
            if !prefix.starts_with('/') {
                errors.push(ValidationError::new(field("path_prefix"), "must start with '/'"));
            }
        }
        let mount = PathPrefixMatcher::new(service.mount_prefix());
        if mount.prefix() == config.health.path {
            errors.push(ValidationError::new(
                field("path_prefix"),
                "collides with the health endpoint",
            ));
        }
        if !prefixes.insert(mount.prefix().to_string()) {
            errors.push(ValidationError::new(
                field("path_prefix"),
                format!("prefix '{}' is already mounted", mount.prefix()),
            ));
        }

        if let Err(e) = service.options.resolve(defaults) {
            errors.push(ValidationError::new(field("options"), e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
