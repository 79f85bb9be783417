//! Health aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! GET <health path>
//!     → aggregator.rs (walk registry, query each breaker)
//!     → HealthSnapshot (recomputed per query, never stored)
//!     → JSON body, 200 when UP, 503 when DEGRADED
//! ```
//!
//! # Design Decisions
//! - Health is derived from breaker state only; there is no active probing
//! - Querying `is_open()` may move an expired OPEN breaker to HALF_OPEN

pub mod aggregator;

pub use aggregator::{snapshot, HealthSnapshot, OverallStatus, ServiceHealth, ServiceStatus};
