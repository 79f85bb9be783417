//! Request router façade and compiled route table.
//!
//! # Responsibilities
//! - Build per-service handlers (failing eagerly for unknown services)
//! - Store compiled routes and look up the route for a request
//! - Return the matched handler or an explicit no-match
//!
//! # Design Decisions
//! - A route table is immutable once built; reloads swap in a new one
//! - Longest prefix wins, ties resolved by service name
//! - Handlers resolve their entry per request, so re-registration takes
//!   effect without rebuilding the table

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::error::RouterResult;
use crate::http::forward::Forwarder;
use crate::registry::ServiceRegistry;
use crate::routing::events::{RouterListener, TracingListener};
use crate::routing::handler::ServiceHandler;
use crate::routing::matcher::PathPrefixMatcher;

/// Entry point for routing requests to registered services.
#[derive(Clone)]
pub struct RequestRouter {
    registry: Arc<ServiceRegistry>,
    forwarder: Arc<dyn Forwarder>,
    listener: Arc<dyn RouterListener>,
}

impl RequestRouter {
    /// Create a router that logs transitions through [`TracingListener`].
    pub fn new(registry: Arc<ServiceRegistry>, forwarder: Arc<dyn Forwarder>) -> Self {
        Self {
            registry,
            forwarder,
            listener: Arc::new(TracingListener),
        }
    }

    /// Replace the event listener.
    pub fn with_listener(mut self, listener: Arc<dyn RouterListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Build the handler for `service` mounted under `path_prefix`.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::ServiceNotRegistered` before any handler exists
    /// when the service is unknown.
    pub fn middleware_for(&self, service: &str, path_prefix: &str) -> RouterResult<ServiceHandler> {
        self.registry.lookup(service)?;
        Ok(ServiceHandler::new(
            service.to_string(),
            PathPrefixMatcher::new(path_prefix),
            self.registry.clone(),
            self.forwarder.clone(),
            self.listener.clone(),
        ))
    }

    /// Route a request to `service` without any path rewriting by prefix.
    pub async fn route(&self, service: &str, request: Request<Body>) -> RouterResult<Response<Body>> {
        self.middleware_for(service, "/")?.handle(request).await
    }
}

/// Compiled set of mounted services.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<ServiceHandler>,
}

impl RouteTable {
    /// Compile `(service, path_prefix)` mounts into a table.
    pub fn build<S, P>(router: &RequestRouter, mounts: &[(S, P)]) -> RouterResult<Self>
    where
        S: AsRef<str>,
        P: AsRef<str>,
    {
        let mut routes = mounts
            .iter()
            .map(|(service, prefix)| router.middleware_for(service.as_ref(), prefix.as_ref()))
            .collect::<RouterResult<Vec<_>>>()?;

        routes.sort_by(|a, b| {
            b.matcher()
                .prefix()
                .len()
                .cmp(&a.matcher().prefix().len())
                .then_with(|| a.service().cmp(b.service()))
        });

        Ok(Self { routes })
    }

    /// Find the handler whose prefix matches the request path.
    pub fn match_request(&self, request: &Request<Body>) -> Option<&ServiceHandler> {
        self.routes.iter().find(|route| route.matcher().matches(request))
    }

    /// Mounted routes in match order.
    pub fn routes(&self) -> &[ServiceHandler] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
