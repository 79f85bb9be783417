//! Service router
//!
//! A request-routing layer built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http server ──▶ route table ──▶ service handler
//!                                                        │
//!                                   circuit breaker ◀────┤ gate
//!                                   load balancer   ◀────┤ select
//!                                   forwarder       ◀────┘ forward ──▶ Backend
//!
//!     Cross-cutting: config (+ hot reload), health, admin API,
//!                    observability, lifecycle
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::net::TcpListener;

use service_router::admin::{self, AdminState};
use service_router::config::watcher::{ConfigWatcher, ReloadEvent};
use service_router::config::{load_config, parse_config, RouterConfig};
use service_router::http::{HttpServer, HyperForwarder};
use service_router::lifecycle::{apply_reload, build_registry, mounts, shutdown_signal, Shutdown};
use service_router::observability::{logging, metrics};
use service_router::routing::{RequestRouter, RouteTable, TracingListener};

#[derive(Parser)]
#[command(name = "service-router")]
#[command(about = "Routes requests to service targets with load balancing and circuit breaking", long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "router.toml")]
    config: PathBuf,

    /// Do not watch the configuration file for changes
    #[arg(long)]
    no_watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        eprintln!(
            "config file {} not found, using defaults",
            args.config.display()
        );
        RouterConfig::default()
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-router starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Core
    let registry = build_registry(&config)?;
    let listener_hooks = Arc::new(TracingListener);
    let router = RequestRouter::new(registry.clone(), Arc::new(HyperForwarder::new()))
        .with_listener(listener_hooks.clone());
    let routes = Arc::new(ArcSwap::from_pointee(RouteTable::build(
        &router,
        &mounts(&config),
    )?));
    let current = Arc::new(ArcSwap::from_pointee(config.clone()));
    let shutdown = Shutdown::new();

    // Admin API
    let mut tasks = Vec::new();
    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        let state = AdminState {
            registry: registry.clone(),
            config: current.clone(),
            listener: listener_hooks,
        };
        let rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = admin::serve(admin_listener, state, rx).await {
                tracing::error!(error = %e, "Admin API failed");
            }
        }));
    }

    // Hot reload
    let _watcher = if args.no_watch || !args.config.exists() {
        None
    } else {
        let (watcher, mut updates) = ConfigWatcher::new(&args.config, parse_config).run()?;
        let router = router.clone();
        let routes = routes.clone();
        let current = current.clone();
        let mut rx = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = updates.recv() => match event {
                        ReloadEvent::Updated(new_config) => {
                            match apply_reload(&router, &routes, &current, *new_config) {
                                Ok(_) => metrics::record_config_reload("applied"),
                                Err(e) => {
                                    tracing::error!(error = %e, "Failed to apply reloaded configuration");
                                    metrics::record_config_reload("failed");
                                }
                            }
                        }
                        // already logged by the watcher
                        ReloadEvent::Rejected(_) => metrics::record_config_reload("rejected"),
                    },
                    _ = rx.recv() => break,
                }
            }
        }));
        Some(watcher)
    };

    // Signals
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(router, routes, &config.health.path);
    server.run(listener, shutdown.subscribe()).await?;

    for task in tasks {
        let _ = task.await;
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
