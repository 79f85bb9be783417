//! Mapping of router errors to HTTP responses.
//!
//! # Design Decisions
//! - Degraded-mode outcomes (open circuit, failed forward, no targets) are 503
//! - An unknown service is 404, rejected admin input is 400
//! - Body is JSON `{error, message}`; `error` is the status reason phrase

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::RouterError;

/// JSON error body returned to callers.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: message.into(),
        }
    }
}

/// Build a JSON error response with the given status.
pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody::new(status, message))).into_response()
}

impl RouterError {
    /// HTTP status surfaced to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::CircuitOpen(_)
            | RouterError::ForwardingFailure { .. }
            | RouterError::NoTargetsAvailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::ServiceNotRegistered(_) => StatusCode::NOT_FOUND,
            RouterError::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        error_response(self.status_code(), self.to_string())
    }
}
