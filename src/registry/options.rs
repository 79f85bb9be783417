//! Registration options and their merge over library-wide defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::error::{RouterError, RouterResult};
use crate::load_balancer::Strategy;
use crate::resilience::BreakerSettings;

/// Library-wide defaults applied to every unset option.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceDefaults {
    pub strategy: Strategy,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
    pub half_open_success_threshold: u32,
    pub request_timeout_ms: u64,
}

impl Default for ServiceDefaults {
    fn default() -> Self {
        Self {
            strategy: Strategy::RoundRobin,
            failure_threshold: 5,
            reset_timeout_ms: 30_000,
            half_open_success_threshold: 3,
            request_timeout_ms: 10_000,
        }
    }
}

/// Per-service breaker overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerOptions {
    pub failure_threshold: Option<u32>,
    pub reset_timeout_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub half_open_success_threshold: Option<u32>,
}

/// Options supplied at registration. Unset fields fall back to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceOptions {
    pub strategy: Option<Strategy>,
    pub circuit_breaker: Option<CircuitBreakerOptions>,
    /// Headers injected into every forwarded response.
    pub response_headers: BTreeMap<String, String>,
    /// Remove the mount prefix from the path before forwarding.
    pub strip_prefix: Option<bool>,
    /// Keep the caller's Host header instead of the target authority.
    pub preserve_host: Option<bool>,
}

/// Fully merged options held by a service entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub strategy: Strategy,
    pub breaker: BreakerSettings,
    pub request_timeout: Duration,
    pub response_headers: Vec<(HeaderName, HeaderValue)>,
    pub strip_prefix: bool,
    pub preserve_host: bool,
}

impl ServiceOptions {
    /// Merge over `defaults`, rejecting zero thresholds, zero timeouts and
    /// malformed headers.
    pub fn resolve(&self, defaults: &ServiceDefaults) -> RouterResult<ResolvedOptions> {
        let cb = self.circuit_breaker.clone().unwrap_or_default();

        let failure_threshold = cb.failure_threshold.unwrap_or(defaults.failure_threshold);
        let half_open_success_threshold = cb
            .half_open_success_threshold
            .unwrap_or(defaults.half_open_success_threshold);
        if failure_threshold == 0 {
            return Err(RouterError::InvalidConfiguration(
                "failure_threshold must be greater than 0".to_string(),
            ));
        }
        if half_open_success_threshold == 0 {
            return Err(RouterError::InvalidConfiguration(
                "half_open_success_threshold must be greater than 0".to_string(),
            ));
        }

        let reset_timeout_ms = cb.reset_timeout_ms.unwrap_or(defaults.reset_timeout_ms);
        let request_timeout_ms = cb.request_timeout_ms.unwrap_or(defaults.request_timeout_ms);
        if reset_timeout_ms == 0 {
            return Err(RouterError::InvalidConfiguration(
                "reset_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if request_timeout_ms == 0 {
            return Err(RouterError::InvalidConfiguration(
                "request_timeout_ms must be greater than 0".to_string(),
            ));
        }

        let mut response_headers = Vec::with_capacity(self.response_headers.len());
        for (name, value) in &self.response_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                RouterError::InvalidConfiguration(format!("invalid response header name '{}'", name))
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                RouterError::InvalidConfiguration(format!(
                    "invalid value for response header '{}'",
                    name
                ))
            })?;
            response_headers.push((name, value));
        }

        Ok(ResolvedOptions {
            strategy: self.strategy.unwrap_or(defaults.strategy),
            breaker: BreakerSettings {
                failure_threshold,
                reset_timeout: Duration::from_millis(reset_timeout_ms),
                half_open_success_threshold,
            },
            request_timeout: Duration::from_millis(request_timeout_ms),
            response_headers,
            strip_prefix: self.strip_prefix.unwrap_or(true),
            preserve_host: self.preserve_host.unwrap_or(false),
        })
    }
}
