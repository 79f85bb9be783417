//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the health endpoint and the proxy fallback
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener and stop on the shutdown signal
//! - Dispatch requests through the live route table
//!
//! # Design Decisions
//! - The route table sits behind `ArcSwap`; reloads never block requests
//! - Routing errors become JSON responses through `IntoResponse`

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::health;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::http::response::error_response;
use crate::routing::{RequestRouter, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: RequestRouter,
    pub routes: Arc<ArcSwap<RouteTable>>,
}

/// HTTP server for the service router.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server that serves `routes` and exposes health at `health_path`.
    pub fn new(router: RequestRouter, routes: Arc<ArcSwap<RouteTable>>, health_path: &str) -> Self {
        let state = AppState { router, routes };
        let router = Self::build_router(health_path, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(health_path: &str, state: AppState) -> Router {
        Router::new()
            .route(health_path, get(health_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// The assembled Axum router, for embedding or in-process tests.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// Handle to the live route table.
    pub fn routes(&self) -> &Arc<ArcSwap<RouteTable>> {
        &self.state.routes
    }

    /// Run the server, accepting connections on the given listener until
    /// the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.state.routes.load().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Aggregate health: 200 when every service is up, 503 otherwise.
async fn health_handler(State(state): State<AppState>) -> Response {
    let snapshot = health::snapshot(state.router.registry());
    let status = if snapshot.is_up() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(snapshot)).into_response()
}

/// Main proxy handler.
/// Looks up the route and hands the request to its service handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let handler = state.routes.load().match_request(&request).cloned();

    let handler = match handler {
        Some(h) => h,
        None => {
            tracing::warn!(
                request_id = %request.request_id(),
                path = %request.uri().path(),
                "No route matched"
            );
            return error_response(
                StatusCode::NOT_FOUND,
                format!("No route matches path '{}'", request.uri().path()),
            );
        }
    };

    match handler.handle(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(service = %handler.service(), code = e.code(), "Request failed");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::Response as HttpResponse;
    use tower::ServiceExt;

    use crate::http::forward::{ForwardError, Forwarder};
    use crate::http::request::X_REQUEST_ID;
    use crate::load_balancer::Target;
    use crate::registry::{ServiceOptions, ServiceRegistry};

    /// Answers with the target address and the forwarded path.
    struct EchoForwarder;

    #[async_trait]
    impl Forwarder for EchoForwarder {
        async fn forward(
            &self,
            target: &Target,
            request: Request<Body>,
        ) -> Result<HttpResponse<Body>, ForwardError> {
            let body = format!("{} {}", target, request.uri().path());
            Ok(HttpResponse::new(Body::from(body)))
        }
    }

    fn server() -> (HttpServer, Arc<ServiceRegistry>) {
        let registry = Arc::new(ServiceRegistry::new());
        registry
            .register("users", &["127.0.0.1:3001"], &ServiceOptions::default())
            .unwrap();
        let router = RequestRouter::new(registry.clone(), Arc::new(EchoForwarder));
        let table = RouteTable::build(&router, &[("users", "/users")]).unwrap();
        let server = HttpServer::new(router, Arc::new(ArcSwap::from_pointee(table)), "/health");
        (server, registry)
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
        let res = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let id = res
            .headers()
            .get(X_REQUEST_ID)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(res.into_body(), 64 * 1024).await.unwrap();
        (status, id, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_routes_and_strips_prefix() {
        let (server, _) = server();
        let (status, id, body) = send(server.app(), "/users/42").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "127.0.0.1:3001 /42");
        assert!(id.is_some());
    }

    #[tokio::test]
    async fn test_unknown_path_is_json_404() {
        let (server, _) = server();
        let (status, _, body) = send(server.app(), "/nowhere").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_health_reflects_breaker() {
        let (server, registry) = server();
        let (status, _, body) = send(server.app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "UP");

        let users = registry.lookup("users").unwrap();
        for _ in 0..5 {
            users.breaker().record_failure();
        }
        let (status, _, body) = send(server.app(), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "DEGRADED");
        assert_eq!(json["services"]["users"]["status"], "DOWN");

        let (status, _, body) = send(server.app(), "/users/1").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body.contains("Circuit breaker is open"));
    }

    #[tokio::test]
    async fn test_swapped_table_takes_effect() {
        let (server, registry) = server();
        registry
            .register("orders", &["127.0.0.1:4001"], &ServiceOptions::default())
            .unwrap();
        let router = server.state.router.clone();
        let table = RouteTable::build(&router, &[("users", "/users"), ("orders", "/orders")])
            .unwrap();
        server.routes().store(Arc::new(table));

        let (status, _, body) = send(server.app(), "/orders/7").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "127.0.0.1:4001 /7");
    }
}
