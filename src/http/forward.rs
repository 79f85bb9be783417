//! Forwarding engine.
//!
//! # Responsibilities
//! - Rewrite the request URI against the selected target
//! - Strip hop-by-hop headers in both directions
//! - Stream the request and response bodies through unchanged
//!
//! The routing core only sees the [`Forwarder`] trait; [`HyperForwarder`]
//! is the production engine built on the hyper legacy client.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, Response, Uri, Version};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Duration;
use thiserror::Error;

use crate::load_balancer::Target;

/// Engine-level failure of a single forward attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForwardError {
    /// Connection refused, reset, or no response received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The forward did not complete within the request timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The upstream request could not be built.
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

/// The reverse-proxy engine the router delegates network forwarding to.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Send `request` to `target` and return whatever response came back.
    async fn forward(
        &self,
        target: &Target,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError>;
}

const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::UPGRADE,
];

/// Remove connection-scoped headers that must not be forwarded.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

/// Build the upstream URI: target scheme and authority, target base path,
/// then the (already rewritten) path and query of the incoming request.
pub fn upstream_uri(target: &Target, original: &Uri) -> Result<Uri, ForwardError> {
    let base = target.base_url();
    let base_path = base.path().trim_end_matches('/');
    let path_and_query = original
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!(
        "{}://{}{}{}",
        base.scheme(),
        target.authority(),
        base_path,
        path_and_query
    )
    .parse::<Uri>()
    .map_err(|e| ForwardError::InvalidRequest(e.to_string()))
}

/// Forwarder backed by a pooled hyper client.
#[derive(Clone)]
pub struct HyperForwarder {
    client: Client<HttpConnector, Body>,
}

impl HyperForwarder {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client }
    }
}

impl Default for HyperForwarder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forwarder for HyperForwarder {
    async fn forward(
        &self,
        target: &Target,
        request: Request<Body>,
    ) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();
        parts.uri = upstream_uri(target, &parts.uri)?;
        parts.version = Version::HTTP_11;
        strip_hop_by_hop(&mut parts.headers);

        let response = self
            .client
            .request(Request::from_parts(parts, body))
            .await
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
