//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: service assumed down, requests fail fast
//! - Half-Open: trial requests pass through to test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: reset_timeout elapsed since last failure (checked on query)
//! Half-Open → Closed: success_count >= half_open_success_threshold
//! Half-Open → Open: any failure
//! ```
//!
//! # Design Decisions
//! - Per-service circuit breaker (not global)
//! - No background timer: the Open → Half-Open move happens inside `is_open`
//! - Failures accumulate while closed and only a success clears them
//! - Transitions are returned to the caller instead of dispatched from here

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

use crate::resilience::clock::{Clock, SystemClock};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(name)
    }
}

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerSettings {
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub half_open_success_threshold: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(30_000),
            half_open_success_threshold: 3,
        }
    }
}

/// A state change caused by a breaker operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Result of a gating query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerCheck {
    pub open: bool,
    pub transition: Option<Transition>,
}

/// Read-only diagnostic snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    /// Milliseconds since the Unix epoch.
    pub last_failure_time: Option<u64>,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<u64>,
}

impl BreakerState {
    fn closed() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
        }
    }

    fn move_to(&mut self, to: CircuitState) -> Option<Transition> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        Some(Transition { from, to })
    }
}

/// Three-state failure isolation for one service.
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Create a closed breaker backed by the system clock.
    pub fn new(settings: BreakerSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// Create a closed breaker with a custom clock.
    pub fn with_clock(settings: BreakerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            inner: Mutex::new(BreakerState::closed()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Whether requests must be rejected.
    ///
    /// An open breaker whose reset timeout has passed moves to half-open
    /// first and then reports `false`.
    pub fn is_open(&self) -> bool {
        self.check().open
    }

    /// Same as [`is_open`](Self::is_open), also reporting the lazy transition.
    pub fn check(&self) -> BreakerCheck {
        let mut inner = self.lock();
        let mut transition = None;

        if inner.state == CircuitState::Open {
            let last = inner.last_failure_time.unwrap_or(0);
            let elapsed = self.clock.now_millis().saturating_sub(last);
            if elapsed > self.settings.reset_timeout.as_millis() as u64 {
                inner.success_count = 0;
                transition = inner.move_to(CircuitState::HalfOpen);
            }
        }

        BreakerCheck {
            open: inner.state == CircuitState::Open,
            transition,
        }
    }

    /// Record a failed forward.
    pub fn record_failure(&self) -> Option<Transition> {
        let mut inner = self.lock();
        inner.last_failure_time = Some(self.clock.now_millis());
        inner.failure_count = inner.failure_count.saturating_add(1);
        inner.success_count = 0;

        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.settings.failure_threshold => {
                inner.move_to(CircuitState::Open)
            }
            CircuitState::HalfOpen => inner.move_to(CircuitState::Open),
            _ => None,
        }
    }

    /// Record a successful forward.
    pub fn record_success(&self) -> Option<Transition> {
        let mut inner = self.lock();
        inner.failure_count = 0;

        if inner.state != CircuitState::HalfOpen {
            return None;
        }

        inner.success_count = inner.success_count.saturating_add(1);
        if inner.success_count >= self.settings.half_open_success_threshold {
            inner.success_count = 0;
            inner.failure_count = 0;
            return inner.move_to(CircuitState::Closed);
        }
        None
    }

    /// Force the breaker closed and clear all counters.
    pub fn reset(&self) -> Option<Transition> {
        let mut inner = self.lock();
        let from = inner.state;
        *inner = BreakerState::closed();
        (from != CircuitState::Closed).then_some(Transition {
            from,
            to: CircuitState::Closed,
        })
    }

    /// Diagnostic snapshot. Does not trigger the lazy transition.
    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner.last_failure_time,
        }
    }
}
