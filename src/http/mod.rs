//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, health route, proxy fallback)
//!     → request.rs (assign and propagate request ID)
//!     → [routing layer picks service handler]
//!     → forward.rs (hyper client sends to the selected target)
//!     → response.rs (router errors mapped to JSON status responses)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{ForwardError, Forwarder, HyperForwarder};
pub use request::{RequestIdExt, X_REQUEST_ID};
pub use response::{error_response, ErrorBody};
pub use server::{AppState, HttpServer};
