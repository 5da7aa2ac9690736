//! Health check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use core_kernel::{AdapterHealth, HealthCheckResult};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub bills: usize,
    pub backups: HealthCheckResult,
}

/// Health check endpoint
///
/// Reports 503 only when the backup store is unusable; a read-only backup
/// directory is still served as degraded.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let backups = state.backups.health_check().await;
    let bills = state.ledger.lock().await.len();

    let (code, status) = match backups.status {
        AdapterHealth::Healthy => (StatusCode::OK, "healthy"),
        AdapterHealth::Degraded => (StatusCode::OK, "degraded"),
        AdapterHealth::Unhealthy => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            bills,
            backups,
        }),
    )
}
