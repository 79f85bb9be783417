//! Aggregate health view over the service registry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::load_balancer::Target;
use crate::registry::ServiceRegistry;
use crate::resilience::CircuitSnapshot;

/// Status of a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Up,
    Down,
}

/// Combined status across all services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Up,
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    pub status: ServiceStatus,
    pub targets: Vec<Target>,
    pub circuit_state: CircuitSnapshot,
}

/// Point-in-time health of every registered service.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: OverallStatus,
    pub services: BTreeMap<String, ServiceHealth>,
}

impl HealthSnapshot {
    pub fn is_up(&self) -> bool {
        self.status == OverallStatus::Up
    }
}

/// Build a health snapshot from the current registry contents.
///
/// A service is `DOWN` while its breaker reports open. The snapshot is
/// taken after the open check so it reflects any lazy OPEN → HALF_OPEN
/// transition the check performed.
pub fn snapshot(registry: &ServiceRegistry) -> HealthSnapshot {
    let mut services = BTreeMap::new();

    for entry in registry.entries() {
        let status = if entry.breaker().is_open() {
            ServiceStatus::Down
        } else {
            ServiceStatus::Up
        };
        services.insert(
            entry.name().to_string(),
            ServiceHealth {
                status,
                targets: entry.targets(),
                circuit_state: entry.breaker().snapshot(),
            },
        );
    }

    let status = if services.values().any(|s| s.status == ServiceStatus::Down) {
        OverallStatus::Degraded
    } else {
        OverallStatus::Up
    };

    HealthSnapshot { status, services }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::registry::{CircuitBreakerOptions, ServiceDefaults, ServiceOptions};
    use crate::resilience::{CircuitState, ManualClock};

    fn registry(clock: Arc<ManualClock>) -> ServiceRegistry {
        let registry = ServiceRegistry::with_clock(ServiceDefaults::default(), clock);
        let options = ServiceOptions {
            circuit_breaker: Some(CircuitBreakerOptions {
                failure_threshold: Some(2),
                reset_timeout_ms: Some(1_000),
                ..Default::default()
            }),
            ..Default::default()
        };
        registry
            .register("users", &["127.0.0.1:3001", "127.0.0.1:3002"], &options)
            .unwrap();
        registry
            .register("orders", &["127.0.0.1:4001"], &options)
            .unwrap();
        registry
    }

    #[test]
    fn test_empty_registry_is_up() {
        let snapshot = snapshot(&ServiceRegistry::new());
        assert!(snapshot.is_up());
        assert!(snapshot.services.is_empty());
    }

    #[test]
    fn test_one_open_breaker_degrades() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let registry = registry(clock);
        let users = registry.lookup("users").unwrap();
        users.breaker().record_failure();
        users.breaker().record_failure();

        let snapshot = snapshot(&registry);
        assert_eq!(snapshot.status, OverallStatus::Degraded);
        assert_eq!(snapshot.services["users"].status, ServiceStatus::Down);
        assert_eq!(snapshot.services["orders"].status, ServiceStatus::Up);
        assert_eq!(snapshot.services["users"].circuit_state.state, CircuitState::Open);
        assert_eq!(snapshot.services["users"].targets.len(), 2);
    }

    #[test]
    fn test_query_after_reset_timeout_reports_half_open() {
        let clock = Arc::new(ManualClock::new(1_000_000));
        let registry = registry(clock.clone());
        let users = registry.lookup("users").unwrap();
        users.breaker().record_failure();
        users.breaker().record_failure();

        clock.advance(Duration::from_millis(1_001));
        let snapshot = snapshot(&registry);
        assert!(snapshot.is_up());
        assert_eq!(
            snapshot.services["users"].circuit_state.state,
            CircuitState::HalfOpen
        );
    }

    #[test]
    fn test_json_shape() {
        let clock = Arc::new(ManualClock::new(5_000));
        let registry = registry(clock);
        let users = registry.lookup("users").unwrap();
        users.breaker().record_failure();
        users.breaker().record_failure();

        let json = serde_json::to_value(snapshot(&registry)).unwrap();
        assert_eq!(json["status"], "DEGRADED");
        assert_eq!(json["services"]["users"]["status"], "DOWN");
        assert_eq!(json["services"]["users"]["targets"][0], "127.0.0.1:3001");
        assert_eq!(json["services"]["users"]["circuitState"]["state"], "OPEN");
        assert_eq!(json["services"]["users"]["circuitState"]["failureCount"], 2);
        assert_eq!(json["services"]["users"]["circuitState"]["lastFailureTime"], 5_000);
        assert_eq!(json["services"]["orders"]["circuitState"]["state"], "CLOSED");
    }
}
