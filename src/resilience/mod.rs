//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for a service:
//!     → circuit_breaker.rs (gate: fail fast while open)
//!     → timeouts.rs (deadline around the forward)
//!     → circuit_breaker.rs (record success/failure outcome)
//! ```
//!
//! # Design Decisions
//! - Every forward has a deadline; expiry counts as a failure
//! - No retries or failover across targets
//! - Breaker time comes from an injectable clock

pub mod circuit_breaker;
pub mod clock;
pub mod timeouts;

pub use circuit_breaker::{
    BreakerCheck, BreakerSettings, CircuitBreaker, CircuitSnapshot, CircuitState, Transition,
};
pub use clock::{Clock, ManualClock, SystemClock};
