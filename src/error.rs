//! Error taxonomy for the router core.
//!
//! `CircuitOpen` and `ForwardingFailure` are the expected, degraded-mode
//! outcomes and are turned into 503 responses at the HTTP boundary. The
//! remaining variants indicate operator error and surface at setup time.

use thiserror::Error;

/// Errors produced by the registry, load balancer and request router.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RouterError {
    /// Registration input was rejected; the registry is unchanged.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// No service is registered under the requested name.
    #[error("Service '{0}' is not registered")]
    ServiceNotRegistered(String),

    /// The load balancer of a service has an empty target list.
    #[error("No targets available for service '{0}'")]
    NoTargetsAvailable(String),

    /// The circuit breaker of a service is open.
    #[error("Circuit breaker is open for service '{0}'")]
    CircuitOpen(String),

    /// The forwarding engine failed to obtain a response from the target.
    #[error("Forwarding to {target} for service '{service}' failed: {reason}")]
    ForwardingFailure {
        service: String,
        target: String,
        reason: String,
    },
}

impl RouterError {
    /// Short machine-readable code used in logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            RouterError::InvalidConfiguration(_) => "invalid_configuration",
            RouterError::ServiceNotRegistered(_) => "service_not_registered",
            RouterError::NoTargetsAvailable(_) => "no_targets_available",
            RouterError::CircuitOpen(_) => "circuit_open",
            RouterError::ForwardingFailure { .. } => "forwarding_failure",
        }
    }
}

/// Result alias used throughout the crate.
pub type RouterResult<T> = Result<T, RouterError>;
