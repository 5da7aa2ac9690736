//! Whole-ledger handlers: summary, reset and CSV interchange

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use domain_metering::{ImportReport, RandomIdGenerator, Summary};

use crate::{error::ApiError, AppState};

pub async fn summary(State(state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    Ok(Json(state.ledger.lock().await.summary()?))
}

/// Deletes every bill and the baseline
pub async fn clear_all(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.ledger.lock().await.clear_all()?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    /// Prefix a UTF-8 byte order mark for spreadsheet apps
    #[serde(default)]
    pub bom: bool,
}

pub async fn export_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = state.ledger.lock().await.export_csv(query.bom)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"electricity-bills.csv\""),
        ],
        csv,
    ))
}

/// Merges the rows of an uploaded CSV file
///
/// Rows that fail sanity checks or repeat a date are skipped and listed in
/// the report.
pub async fn import_csv(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ImportReport>, ApiError> {
    let report = state
        .ledger
        .lock()
        .await
        .import_csv(&body, &mut RandomIdGenerator)?;
    Ok(Json(report))
}
