//! Baseline settings handlers

use axum::{extract::State, Json};

use crate::dto::settings::*;
use crate::{error::ApiError, AppState};

pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(state.ledger.lock().await.baseline().into())
}

/// Replaces the baseline readings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let settings = request.into_settings()?;
    let mut ledger = state.ledger.lock().await;
    ledger.set_baseline(settings)?;
    Ok(Json(ledger.baseline().into()))
}
