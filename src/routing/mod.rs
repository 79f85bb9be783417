//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (route table lookup, longest prefix first)
//!     → matcher.rs (segment-aware prefix match)
//!     → handler.rs (breaker gate → balancer → forwarder → outcome)
//!     → events.rs (transition and failure notifications)
//!
//! Route Compilation (at startup and on reload):
//!     service mounts
//!     → Resolve each service (unknown service = error)
//!     → Sort by prefix length
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled up front, swapped atomically on reload
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod events;
pub mod handler;
pub mod matcher;
pub mod router;


pub use events::{NoopListener, RouterListener, TracingListener};
pub use handler::ServiceHandler;
pub use matcher::PathPrefixMatcher;
pub use router::{RequestRouter, RouteTable};
