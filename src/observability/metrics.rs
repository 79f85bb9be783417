//! Metrics collection and exposition.
//!
//! # Metrics
//! - `router_requests_total` (counter): requests by service, target, status
//! - `router_request_duration_seconds` (histogram): latency per service
//! - `router_circuit_rejections_total` (counter): fail-fast rejections
//! - `router_forward_failures_total` (counter): transport errors and timeouts
//! - `router_circuit_state` (gauge): 0 closed, 1 half-open, 2 open
//! - `router_config_reloads_total` (counter): reload attempts by outcome
//!
//! All helpers are no-ops until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &str, target: &str, status: u16, start: Instant) {
    metrics::counter!(
        "router_requests_total",
        "service" => service.to_string(),
        "target" => target.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("router_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_circuit_rejection(service: &str) {
    metrics::counter!("router_circuit_rejections_total", "service" => service.to_string())
        .increment(1);
}

pub fn record_forward_failure(service: &str, target: &str) {
    metrics::counter!(
        "router_forward_failures_total",
        "service" => service.to_string(),
        "target" => target.to_string()
    )
    .increment(1);
}

pub fn record_circuit_state(service: &str, state: CircuitState) {
    metrics::gauge!("router_circuit_state", "service" => service.to_string()).set(state.as_gauge());
}

/// `outcome` is one of `applied`, `rejected`, `failed`.
pub fn record_config_reload(outcome: &'static str) {
    metrics::counter!("router_config_reloads_total", "outcome" => outcome).increment(1);
}
