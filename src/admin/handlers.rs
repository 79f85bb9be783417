use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::admin::AdminState;
use crate::error::RouterResult;
use crate::health::{self, OverallStatus};
use crate::load_balancer::Strategy;
use crate::resilience::CircuitSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: OverallStatus,
    pub services: usize,
}

#[derive(Serialize)]
pub struct TargetStatus {
    pub address: String,
    pub active_connections: usize,
}

#[derive(Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub strategy: Strategy,
    pub request_timeout_ms: u64,
    pub targets: Vec<TargetStatus>,
    pub circuit: CircuitSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub target: String,
}

#[derive(Serialize)]
pub struct TargetChange {
    pub service: String,
    pub target: String,
    pub changed: bool,
    pub targets: Vec<String>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let snapshot = health::snapshot(&state.registry);
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: snapshot.status,
        services: snapshot.services.len(),
    })
}

pub async fn get_services(State(state): State<AdminState>) -> Json<Vec<ServiceSummary>> {
    let summaries = state
        .registry
        .entries()
        .into_iter()
        .map(|entry| ServiceSummary {
            name: entry.name().to_string(),
            strategy: entry.balancer().strategy(),
            request_timeout_ms: entry.options().request_timeout.as_millis() as u64,
            targets: entry
                .balancer()
                .connection_counts()
                .into_iter()
                .map(|(target, active_connections)| TargetStatus {
                    address: target.to_string(),
                    active_connections,
                })
                .collect(),
            circuit: entry.breaker().snapshot(),
        })
        .collect();

    Json(summaries)
}

/// Force the breaker of a service back to CLOSED.
pub async fn reset_service(
    State(state): State<AdminState>,
    Path(name): Path<String>,
) -> RouterResult<Json<CircuitSnapshot>> {
    let entry = state.registry.lookup(&name)?;
    if let Some(transition) = entry.breaker().reset() {
        state.listener.on_circuit_transition(&name, transition);
    }
    tracing::info!(service = %name, "Circuit breaker reset via admin API");
    Ok(Json(entry.breaker().snapshot()))
}

pub async fn add_target(
    State(state): State<AdminState>,
    Path(name): Path<String>,
    Json(body): Json<TargetRequest>,
) -> RouterResult<Json<TargetChange>> {
    let changed = state.registry.add_target(&name, &body.target)?;
    Ok(Json(target_change(&state, name, body.target, changed)?))
}

pub async fn remove_target(
    State(state): State<AdminState>,
    Path(name): Path<String>,
    Json(body): Json<TargetRequest>,
) -> RouterResult<Json<TargetChange>> {
    let changed = state.registry.remove_target(&name, &body.target)?;
    Ok(Json(target_change(&state, name, body.target, changed)?))
}

fn target_change(
    state: &AdminState,
    service: String,
    target: String,
    changed: bool,
) -> RouterResult<TargetChange> {
    let targets = state
        .registry
        .lookup(&service)?
        .targets()
        .iter()
        .map(|t| t.to_string())
        .collect();
    Ok(TargetChange {
        service,
        target,
        changed,
        targets,
    })
}
