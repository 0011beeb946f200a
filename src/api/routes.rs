use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::LatencyStats;
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct ApiState {
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .with_state(state)
}

/// Bind the status server and serve until the process exits.
pub async fn serve(port: u16, state: ApiState) -> Result<()> {
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Status API listening on {bind_addr}");
    axum::serve(listener, router(state))
        .await
        .map_err(|e| AppError::Server(e.to_string()))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq)]
pub struct LatencyResponse {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    let (p50, p95, p99) = state.latency.percentiles();
    let to_ms = |us: Option<u64>| us.map(|v| v as f64 / 1_000.0);
    Json(LatencyResponse {
        samples: state.latency.len(),
        p50_ms: to_ms(p50),
        p95_ms: to_ms(p95),
        p99_ms: to_ms(p99),
    })
}
