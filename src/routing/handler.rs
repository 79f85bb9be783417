//! Per-service request handling.
//!
//! # Data Flow
//! ```text
//! Request bound to a service
//!     → registry lookup (entry may have been re-registered)
//!     → circuit breaker gate (open → CircuitOpen, balancer untouched)
//!     → load balancer selection (guard holds any reserved slot)
//!     → path/host rewrite
//!     → forwarder (with request timeout)
//!     → outcome recorded: transport error or 5xx → failure, else success
//!     → guard dropped (slot released exactly once)
//!     → response headers injected
//! ```
//!
//! # Design Decisions
//! - Locks are held only inside selection and outcome recording, never
//!   across the forward
//! - No retries and no failover to another target

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};

use crate::error::{RouterError, RouterResult};
use crate::http::forward::Forwarder;
use crate::http::request::RequestIdExt;
use crate::load_balancer::Target;
use crate::observability::metrics;
use crate::registry::{ServiceEntry, ServiceRegistry};
use crate::resilience::timeouts::with_deadline;
use crate::resilience::Transition;
use crate::routing::events::RouterListener;
use crate::routing::matcher::PathPrefixMatcher;

/// Handler bound to one service name and mount prefix.
#[derive(Clone)]
pub struct ServiceHandler {
    service: String,
    matcher: PathPrefixMatcher,
    registry: Arc<ServiceRegistry>,
    forwarder: Arc<dyn Forwarder>,
    listener: Arc<dyn RouterListener>,
}

impl std::fmt::Debug for ServiceHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("service", &self.service)
            .field("prefix", &self.matcher.prefix())
            .finish()
    }
}

impl ServiceHandler {
    pub(crate) fn new(
        service: String,
        matcher: PathPrefixMatcher,
        registry: Arc<ServiceRegistry>,
        forwarder: Arc<dyn Forwarder>,
        listener: Arc<dyn RouterListener>,
    ) -> Self {
        Self {
            service,
            matcher,
            registry,
            forwarder,
            listener,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn matcher(&self) -> &PathPrefixMatcher {
        &self.matcher
    }

    fn notify(&self, transition: Option<Transition>) {
        if let Some(transition) = transition {
            self.listener.on_circuit_transition(&self.service, transition);
        }
    }

    /// Route one request to the bound service.
    pub async fn handle(&self, request: Request<Body>) -> RouterResult<Response<Body>> {
        let start = Instant::now();
        let entry = self.registry.lookup(&self.service)?;
        let name = entry.name();
        let request_id = request.request_id().to_string();

        // 1. Gate
        let check = entry.breaker().check();
        self.notify(check.transition);
        if check.open {
            self.listener.on_circuit_rejected(name);
            metrics::record_request(name, "none", 503, start);
            return Err(RouterError::CircuitOpen(name.to_string()));
        }

        // 2. Select
        let guard = entry
            .balancer()
            .acquire()
            .map_err(|_| RouterError::NoTargetsAvailable(name.to_string()))?;
        let target = guard.target().clone();

        tracing::debug!(
            request_id = %request_id,
            service = %name,
            target = %target,
            path = %request.uri().path(),
            "Forwarding request"
        );

        // 3. Forward
        let request = self.rewrite(request, &entry, &target);
        let outcome = with_deadline(
            entry.options().request_timeout,
            self.forwarder.forward(&target, request),
        )
        .await;
        drop(guard);

        // 4. Record
        match outcome {
            Ok(mut response) => {
                let status = response.status();
                if status.is_server_error() {
                    self.notify(entry.breaker().record_failure());
                    tracing::warn!(
                        request_id = %request_id,
                        service = %name,
                        target = %target,
                        status = %status,
                        "Upstream server error"
                    );
                } else {
                    self.notify(entry.breaker().record_success());
                }
                metrics::record_request(name, target.as_str(), status.as_u16(), start);

                for (header_name, value) in &entry.options().response_headers {
                    response
                        .headers_mut()
                        .insert(header_name.clone(), value.clone());
                }
                Ok(response)
            }
            Err(error) => {
                self.notify(entry.breaker().record_failure());
                self.listener.on_forward_failure(name, &target, &error);
                metrics::record_request(name, target.as_str(), 503, start);
                Err(RouterError::ForwardingFailure {
                    service: name.to_string(),
                    target: target.to_string(),
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Apply the service's path and host options.
    fn rewrite(&self, request: Request<Body>, entry: &ServiceEntry, target: &Target) -> Request<Body> {
        let (mut parts, body) = request.into_parts();
        let options = entry.options();

        if options.strip_prefix {
            if let Some(uri) = self.matcher.strip_uri(&parts.uri) {
                parts.uri = uri;
            }
        }

        if !options.preserve_host {
            if let Ok(host) = HeaderValue::from_str(&target.authority()) {
                parts.headers.insert(header::HOST, host);
            }
        }

        Request::from_parts(parts, body)
    }
}
