//! Service router library.
//!
//! Routes requests for named services to interchangeable backend targets,
//! choosing a target per request and isolating callers from failing
//! services with a per-service circuit breaker.
//!
//! ```
//! use service_router::registry::{ServiceOptions, ServiceRegistry};
//!
//! let registry = ServiceRegistry::new();
//! registry
//!     .register("users", &["127.0.0.1:3001", "127.0.0.1:3002"], &ServiceOptions::default())
//!     .unwrap();
//! let users = registry.lookup("users").unwrap();
//! assert!(!users.breaker().is_open());
//! ```

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod registry;
pub mod routing;

// Traffic management
pub mod health;
pub mod load_balancer;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::ServiceRegistry;
pub use routing::{RequestRouter, RouteTable};
