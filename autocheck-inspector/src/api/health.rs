//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::Phase;
use crate::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Module name ("autocheck-inspector")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    pub uptime_seconds: u64,
    /// Rooms currently in the session
    pub rooms: usize,
    /// Assessment tasks still running, superseded ones included
    pub in_flight: usize,
    pub phase: Phase,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let global = state.registry.global().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        module: "autocheck-inspector".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        rooms: state.registry.len().await,
        in_flight: state.registry.in_flight(),
        phase: global.phase,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
