//! Startup orchestration and config reconciliation.
//!
//! # Responsibilities
//! - Build the service registry from a validated configuration
//! - Derive the `(service, prefix)` mounts for the route table
//! - Reconcile a live registry against a reloaded configuration
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Unchanged services keep their entry (and breaker state) across reloads
//! - Changed services are re-registered, which starts a fresh breaker
//! - Removed services are dropped only after the new route table is live

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::config::{RouterConfig, ServiceConfig};
use crate::error::RouterResult;
use crate::registry::ServiceRegistry;
use crate::routing::{RequestRouter, RouteTable};

/// Create a registry holding every service of `config`.
pub fn build_registry(config: &RouterConfig) -> RouterResult<Arc<ServiceRegistry>> {
    let registry = Arc::new(ServiceRegistry::with_defaults(config.defaults.clone()));
    for service in &config.services {
        registry.register(&service.name, &service.targets, &service.options)?;
    }
    Ok(registry)
}

/// `(service, path_prefix)` pairs in configuration order.
pub fn mounts(config: &RouterConfig) -> Vec<(String, String)> {
    config
        .services
        .iter()
        .map(|s| (s.name.clone(), s.mount_prefix()))
        .collect()
}

/// What a reload changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReloadSummary {
    pub registered: Vec<String>,
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
}

/// Bring `registry` in line with `new`, registering new and changed services.
///
/// Services absent from `new` are returned in `removed` but not yet
/// deregistered; the caller drops them once no route points at them.
pub fn reconcile(
    registry: &ServiceRegistry,
    old: &RouterConfig,
    new: &RouterConfig,
) -> RouterResult<ReloadSummary> {
    let defaults_changed = old.defaults != new.defaults;
    registry.set_defaults(new.defaults.clone());

    let previous: HashMap<&str, &ServiceConfig> =
        old.services.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut summary = ReloadSummary::default();
    for service in &new.services {
        let same = previous.get(service.name.as_str()) == Some(&service);
        if same && !defaults_changed && registry.lookup(&service.name).is_ok() {
            summary.unchanged.push(service.name.clone());
            continue;
        }
        registry.register(&service.name, &service.targets, &service.options)?;
        summary.registered.push(service.name.clone());
    }

    summary.removed = registry
        .names()
        .into_iter()
        .filter(|name| !new.services.iter().any(|s| &s.name == name))
        .collect();

    Ok(summary)
}

/// Apply a reloaded configuration to the running router.
///
/// Reconciles the registry, compiles and swaps the route table, then
/// deregisters services that are no longer configured.
pub fn apply_reload(
    router: &RequestRouter,
    routes: &ArcSwap<RouteTable>,
    current: &ArcSwap<RouterConfig>,
    new: RouterConfig,
) -> RouterResult<ReloadSummary> {
    let old = current.load_full();
    let registry = router.registry();

    let summary = reconcile(registry, &old, &new)?;
    let table = RouteTable::build(router, &mounts(&new))?;
    routes.store(Arc::new(table));

    for name in &summary.removed {
        registry.deregister(name)?;
    }

    if old.listener != new.listener || old.health != new.health {
        tracing::warn!("Listener and health path changes take effect after restart");
    }

    current.store(Arc::new(new));
    tracing::info!(
        registered = ?summary.registered,
        unchanged = summary.unchanged.len(),
        removed = ?summary.removed,
        "Configuration reloaded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::http::HyperForwarder;

    const BASE: &str = r#"
[[services]]
name = "users"
targets = ["127.0.0.1:3001", "127.0.0.1:3002"]

[[services]]
name = "orders"
targets = ["127.0.0.1:4001"]
"#;

    #[test]
    fn test_build_registry_and_mounts() {
        let config = parse_config(BASE).unwrap();
        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.names(), vec!["orders", "users"]);
        assert_eq!(
            mounts(&config),
            vec![
                ("users".to_string(), "/users".to_string()),
                ("orders".to_string(), "/orders".to_string()),
            ]
        );
    }

    #[test]
    fn test_reconcile_keeps_unchanged_breaker_state() {
        let old = parse_config(BASE).unwrap();
        let registry = build_registry(&old).unwrap();
        let users = registry.lookup("users").unwrap();
        users.breaker().record_failure();

        let new = parse_config(
            r#"
[[services]]
name = "users"
targets = ["127.0.0.1:3001", "127.0.0.1:3002"]

[[services]]
name = "orders"
targets = ["127.0.0.1:4001", "127.0.0.1:4002"]

[[services]]
name = "billing"
targets = ["127.0.0.1:5001"]
"#,
        )
        .unwrap();

        let summary = reconcile(&registry, &old, &new).unwrap();
        assert_eq!(summary.unchanged, vec!["users"]);
        assert_eq!(summary.registered, vec!["orders", "billing"]);
        assert!(summary.removed.is_empty());

        let users_after = registry.lookup("users").unwrap();
        assert!(Arc::ptr_eq(&users, &users_after));
        assert_eq!(users_after.breaker().snapshot().failure_count, 1);
        assert_eq!(registry.lookup("orders").unwrap().targets().len(), 2);
    }

    #[test]
    fn test_changed_defaults_reregister_everything() {
        let old = parse_config(BASE).unwrap();
        let registry = build_registry(&old).unwrap();
        let mut new = old.clone();
        new.defaults.failure_threshold = 2;

        let summary = reconcile(&registry, &old, &new).unwrap();
        assert_eq!(summary.registered.len(), 2);
        assert_eq!(
            registry.lookup("users").unwrap().breaker().settings().failure_threshold,
            2
        );
    }

    #[tokio::test]
    async fn test_apply_reload_swaps_routes_and_drops_removed() {
        let old = parse_config(BASE).unwrap();
        let registry = build_registry(&old).unwrap();
        let router = RequestRouter::new(registry.clone(), Arc::new(HyperForwarder::new()));
        let routes = ArcSwap::from_pointee(RouteTable::build(&router, &mounts(&old)).unwrap());
        let current = ArcSwap::from_pointee(old);

        let new = parse_config(
            r#"
[[services]]
name = "users"
targets = ["127.0.0.1:3001", "127.0.0.1:3002"]
path_prefix = "/api/users"
"#,
        )
        .unwrap();

        let summary = apply_reload(&router, &routes, &current, new).unwrap();
        assert_eq!(summary.removed, vec!["orders"]);
        assert!(registry.lookup("orders").is_err());

        let table = routes.load();
        assert_eq!(table.len(), 1);
        assert_eq!(table.routes()[0].matcher().prefix(), "/api/users");
        assert_eq!(current.load().services.len(), 1);
    }
}
