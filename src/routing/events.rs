//! Observer hooks for routing events.
//!
//! Listeners are invoked synchronously by the service handler, after the
//! breaker or load balancer lock has been released.

use crate::http::forward::ForwardError;
use crate::load_balancer::Target;
use crate::observability::metrics;
use crate::resilience::{CircuitState, Transition};

/// Receives breaker transitions and forwarding failures.
///
/// Every hook defaults to a no-op.
pub trait RouterListener: Send + Sync {
    fn on_circuit_transition(&self, _service: &str, _transition: Transition) {}

    fn on_circuit_rejected(&self, _service: &str) {}

    fn on_forward_failure(&self, _service: &str, _target: &Target, _error: &ForwardError) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl RouterListener for NoopListener {}

/// Default listener: structured logs plus metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl RouterListener for TracingListener {
    fn on_circuit_transition(&self, service: &str, transition: Transition) {
        match transition.to {
            CircuitState::Open => tracing::warn!(
                service = %service,
                from = %transition.from,
                "Circuit opened"
            ),
            CircuitState::HalfOpen => tracing::info!(
                service = %service,
                "Circuit half-open, allowing trial requests"
            ),
            CircuitState::Closed => tracing::info!(
                service = %service,
                from = %transition.from,
                "Circuit closed"
            ),
        }
        metrics::record_circuit_state(service, transition.to);
    }

    fn on_circuit_rejected(&self, service: &str) {
        tracing::debug!(service = %service, "Request rejected, circuit open");
        metrics::record_circuit_rejection(service);
    }

    fn on_forward_failure(&self, service: &str, target: &Target, error: &ForwardError) {
        tracing::error!(service = %service, target = %target, error = %error, "Forwarding failed");
        metrics::record_forward_failure(service, target.as_str());
    }
}
