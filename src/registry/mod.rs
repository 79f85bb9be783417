//! Service registry.
//!
//! Maps a service name to its entry: the ordered targets held by a
//! [`LoadBalancer`], a [`CircuitBreaker`], and the merged options.
//!
//! # Design Decisions
//! - Lock-free map of entries; each entry guards its own state so unrelated
//!   services never serialize on each other
//! - Re-registration replaces the whole entry, breaker history included
//! - Validation happens before the map is touched

mod options;

pub use options::{CircuitBreakerOptions, ResolvedOptions, ServiceDefaults, ServiceOptions};

use std::collections::HashSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;

use crate::error::{RouterError, RouterResult};
use crate::load_balancer::{LoadBalancer, Target};
use crate::resilience::{CircuitBreaker, Clock, SystemClock};

/// One registered service.
#[derive(Debug)]
pub struct ServiceEntry {
    name: String,
    options: ResolvedOptions,
    balancer: Arc<LoadBalancer>,
    breaker: CircuitBreaker,
}

impl ServiceEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn balancer(&self) -> &Arc<LoadBalancer> {
        &self.balancer
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Snapshot of the current target list.
    pub fn targets(&self) -> Vec<Target> {
        self.balancer.list_targets()
    }
}

/// Registry of services keyed by name.
///
/// # Examples
///
/// ```
/// use service_router::registry::{ServiceRegistry, ServiceOptions};
///
/// let registry = ServiceRegistry::new();
/// registry
///     .register("users", &["127.0.0.1:3001", "127.0.0.1:3002"], &ServiceOptions::default())
///     .unwrap();
/// assert_eq!(registry.lookup("users").unwrap().targets().len(), 2);
/// assert!(registry.lookup("orders").is_err());
/// ```
#[derive(Debug)]
pub struct ServiceRegistry {
    services: DashMap<String, Arc<ServiceEntry>>,
    defaults: ArcSwap<ServiceDefaults>,
    clock: Arc<dyn Clock>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    /// Create an empty registry with built-in defaults.
    pub fn new() -> Self {
        Self::with_defaults(ServiceDefaults::default())
    }

    /// Create an empty registry with custom library-wide defaults.
    pub fn with_defaults(defaults: ServiceDefaults) -> Self {
        Self::with_clock(defaults, Arc::new(SystemClock))
    }

    /// Create a registry whose breakers read time from `clock`.
    pub fn with_clock(defaults: ServiceDefaults, clock: Arc<dyn Clock>) -> Self {
        Self {
            services: DashMap::new(),
            defaults: ArcSwap::from_pointee(defaults),
            clock,
        }
    }

    /// Current library-wide defaults.
    pub fn defaults(&self) -> Arc<ServiceDefaults> {
        self.defaults.load_full()
    }

    /// Replace the defaults. Existing entries keep the options they were
    /// registered with.
    pub fn set_defaults(&self, defaults: ServiceDefaults) {
        self.defaults.store(Arc::new(defaults));
    }

    /// Register (or replace) a service.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::InvalidConfiguration` when the name is empty,
    /// `targets` is empty, contains duplicates or unparseable addresses, or
    /// the options do not resolve. The registry is left unchanged.
    pub fn register<S: AsRef<str>>(
        &self,
        name: &str,
        targets: &[S],
        options: &ServiceOptions,
    ) -> RouterResult<Arc<ServiceEntry>> {
        if name.trim().is_empty() {
            return Err(RouterError::InvalidConfiguration(
                "service name must not be empty".to_string(),
            ));
        }
        if targets.is_empty() {
            return Err(RouterError::InvalidConfiguration(format!(
                "service '{}' must have at least one target",
                name
            )));
        }

        let mut seen = HashSet::with_capacity(targets.len());
        let mut parsed = Vec::with_capacity(targets.len());
        for raw in targets {
            let target = Target::parse(raw.as_ref())?;
            if !seen.insert(target.clone()) {
                return Err(RouterError::InvalidConfiguration(format!(
                    "service '{}' lists target '{}' more than once",
                    name, target
                )));
            }
            parsed.push(target);
        }

        let options = options.resolve(&self.defaults.load())?;
        let entry = Arc::new(ServiceEntry {
            name: name.to_string(),
            balancer: Arc::new(LoadBalancer::new(parsed, options.strategy)),
            breaker: CircuitBreaker::with_clock(options.breaker, self.clock.clone()),
            options,
        });

        let replaced = self
            .services
            .insert(name.to_string(), entry.clone())
            .is_some();

        tracing::info!(
            service = %name,
            targets = targets.len(),
            strategy = %entry.options.strategy,
            replaced,
            "Service registered"
        );
        Ok(entry)
    }

    /// Look up a service.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::ServiceNotRegistered` when no entry exists.
    pub fn lookup(&self, name: &str) -> RouterResult<Arc<ServiceEntry>> {
        self.services
            .get(name)
            .map(|r| r.value().clone())
            .ok_or_else(|| RouterError::ServiceNotRegistered(name.to_string()))
    }

    /// Remove a service.
    pub fn deregister(&self, name: &str) -> RouterResult<Arc<ServiceEntry>> {
        let (_, entry) = self
            .services
            .remove(name)
            .ok_or_else(|| RouterError::ServiceNotRegistered(name.to_string()))?;
        tracing::info!(service = %name, "Service deregistered");
        Ok(entry)
    }

    /// Add a target to a registered service. Returns false if already present.
    pub fn add_target(&self, name: &str, address: &str) -> RouterResult<bool> {
        let entry = self.lookup(name)?;
        let target = Target::parse(address)?;
        let added = entry.balancer.add_target(target);
        if added {
            tracing::info!(service = %name, target = %address, "Target added");
        }
        Ok(added)
    }

    /// Remove a target from a registered service. Returns false if absent.
    pub fn remove_target(&self, name: &str, address: &str) -> RouterResult<bool> {
        let entry = self.lookup(name)?;
        let target = Target::parse(address)?;
        let removed = entry.balancer.remove_target(&target);
        if removed {
            tracing::info!(service = %name, target = %address, "Target removed");
        }
        Ok(removed)
    }

    /// Registered service names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> Vec<Arc<ServiceEntry>> {
        let mut entries: Vec<Arc<ServiceEntry>> =
            self.services.iter().map(|r| r.value().clone()).collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::Strategy;
    use crate::resilience::CircuitState;

    fn no_options() -> ServiceOptions {
        ServiceOptions::default()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = ServiceRegistry::new();
        let entry = registry
            .register("svc", &["127.0.0.1:4001", "127.0.0.1:4002"], &no_options())
            .unwrap();
        assert_eq!(entry.name(), "svc");
        assert_eq!(entry.options().strategy, Strategy::RoundRobin);

        let found = registry.lookup("svc").unwrap();
        assert!(Arc::ptr_eq(&entry, &found));
        assert_eq!(
            found
                .targets()
                .iter()
                .map(|t| t.as_str().to_string())
                .collect::<Vec<_>>(),
            vec!["127.0.0.1:4001", "127.0.0.1:4002"]
        );
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = ServiceRegistry::new();
        assert_eq!(
            registry.lookup("ghost").unwrap_err(),
            RouterError::ServiceNotRegistered("ghost".to_string())
        );
    }

    #[test]
    fn test_empty_targets_rejected() {
        let registry = ServiceRegistry::new();
        let empty: [&str; 0] = [];
        assert!(matches!(
            registry.register("svc", &empty, &no_options()),
            Err(RouterError::InvalidConfiguration(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let registry = ServiceRegistry::new();
        let result = registry.register("svc", &["localhost:1", "localhost:1"], &no_options());
        assert!(matches!(result, Err(RouterError::InvalidConfiguration(_))));
        assert!(registry.lookup("svc").is_err());
    }

    #[test]
    fn test_failed_reregistration_keeps_old_entry() {
        let registry = ServiceRegistry::new();
        let first = registry.register("svc", &["localhost:1"], &no_options()).unwrap();
        let empty: [&str; 0] = [];
        assert!(registry.register("svc", &empty, &no_options()).is_err());
        assert!(Arc::ptr_eq(&first, &registry.lookup("svc").unwrap()));
    }

    #[test]
    fn test_reregistration_discards_breaker_state() {
        let registry = ServiceRegistry::new();
        let options = ServiceOptions {
            circuit_breaker: Some(CircuitBreakerOptions {
                failure_threshold: Some(1),
                ..Default::default()
            }),
            ..Default::default()
        };
        let entry = registry.register("svc", &["localhost:1"], &options).unwrap();
        entry.breaker().record_failure();
        assert!(entry.breaker().is_open());

        registry.register("svc", &["localhost:2"], &options).unwrap();
        let fresh = registry.lookup("svc").unwrap();
        assert_eq!(fresh.breaker().snapshot().state, CircuitState::Closed);
        assert!(!fresh.breaker().is_open());
        assert_eq!(fresh.targets()[0].as_str(), "localhost:2");
    }

    #[test]
    fn test_custom_defaults_apply() {
        let registry = ServiceRegistry::with_defaults(ServiceDefaults {
            strategy: Strategy::Random,
            failure_threshold: 9,
            ..Default::default()
        });
        let entry = registry.register("svc", &["localhost:1"], &no_options()).unwrap();
        assert_eq!(entry.options().strategy, Strategy::Random);
        assert_eq!(entry.breaker().settings().failure_threshold, 9);
    }

    #[test]
    fn test_deregister() {
        let registry = ServiceRegistry::new();
        registry.register("svc", &["localhost:1"], &no_options()).unwrap();
        assert!(registry.deregister("svc").is_ok());
        assert!(registry.lookup("svc").is_err());
        assert!(registry.deregister("svc").is_err());
    }

    #[test]
    fn test_target_mutation_through_registry() {
        let registry = ServiceRegistry::new();
        registry.register("svc", &["localhost:1"], &no_options()).unwrap();
        assert!(registry.add_target("svc", "localhost:2").unwrap());
        assert!(!registry.add_target("svc", "localhost:2").unwrap());
        assert!(registry.remove_target("svc", "localhost:1").unwrap());
        assert!(!registry.remove_target("svc", "localhost:1").unwrap());
        assert_eq!(registry.lookup("svc").unwrap().targets().len(), 1);
        assert!(registry.add_target("ghost", "localhost:3").is_err());
    }

    #[test]
    fn test_names_sorted() {
        let registry = ServiceRegistry::new();
        registry.register("b", &["localhost:1"], &no_options()).unwrap();
        registry.register("a", &["localhost:2"], &no_options()).unwrap();
        assert_eq!(registry.names(), vec!["a", "b"]);
        assert_eq!(registry.entries()[0].name(), "a");
        assert_eq!(registry.len(), 2);
    }
}
