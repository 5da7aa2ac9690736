//! Bill handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use core_kernel::BillId;
use domain_metering::{Bill, Ledger, RandomIdGenerator, UndoToken};

use crate::dto::bills::*;
use crate::{error::ApiError, AppState};

fn row_for(ledger: &Ledger, id: BillId) -> Result<BillRowResponse, ApiError> {
    if !ledger.has_baseline() {
        let bill = ledger
            .bill(id)
            .ok_or_else(|| ApiError::NotFound(format!("Bill not found: {}", id)))?;
        return Ok(BillRowResponse::unmeasured(bill));
    }
    ledger
        .rows()?
        .into_iter()
        .find(|row| row.bill.id == id)
        .map(BillRowResponse::from)
        .ok_or_else(|| ApiError::NotFound(format!("Bill not found: {}", id)))
}

fn parse_id(raw: &str) -> Result<BillId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid bill id: {}", raw)))
}

/// Lists bills in date order with their derived figures
pub async fn list_bills(State(state): State<AppState>) -> Result<Json<Vec<BillRowResponse>>, ApiError> {
    let ledger = state.ledger.lock().await;
    let rows = if ledger.has_baseline() {
        ledger.rows()?.into_iter().map(BillRowResponse::from).collect()
    } else {
        ledger.bills().into_iter().map(BillRowResponse::unmeasured).collect()
    };
    Ok(Json(rows))
}

/// Gets a bill by ID
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BillRowResponse>, ApiError> {
    let id = parse_id(&id)?;
    let ledger = state.ledger.lock().await;
    Ok(Json(row_for(&ledger, id)?))
}

/// Validates and adds a bill
pub async fn create_bill(
    State(state): State<AppState>,
    Json(request): Json<BillRequest>,
) -> Result<(StatusCode, Json<BillRowResponse>), ApiError> {
    let candidate = request.into_candidate();
    let mut ledger = state.ledger.lock().await;
    let bill = ledger.add_checked(&candidate, &mut RandomIdGenerator)?;
    Ok((StatusCode::CREATED, Json(row_for(&ledger, bill.id)?)))
}

/// Validates and replaces every field of a bill
pub async fn update_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BillRequest>,
) -> Result<Json<BillRowResponse>, ApiError> {
    let id = parse_id(&id)?;
    let candidate = request.into_candidate();
    let mut ledger = state.ledger.lock().await;
    ledger.update_checked(id, &candidate)?;
    Ok(Json(row_for(&ledger, id)?))
}

/// Deletes a bill and returns the offer to undo it
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UndoOfferResponse>, ApiError> {
    let id = parse_id(&id)?;
    let offer = state.ledger.lock().await.delete_by_id(id)?;
    Ok(Json(offer.into()))
}

/// Reverts the deletion behind `token`
pub async fn undo(
    State(state): State<AppState>,
    Path(token): Path<u64>,
) -> Result<Json<Bill>, ApiError> {
    let restored = state.ledger.lock().await.undo(UndoToken(token))?;
    Ok(Json(restored))
}
