//! Backup handlers
//!
//! The ledger lock is released before any call to the backup store.

use axum::{extract::State, http::header, response::IntoResponse, Json};
use tracing::{info, warn};

use domain_metering::{normalize_backup_id, RandomIdGenerator};

use crate::dto::backup::*;
use crate::{error::ApiError, AppState};

/// The ledger as a downloadable backup document
pub async fn download_backup(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let document = state.ledger.lock().await.backup_document()?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"electricity-backup.json\""),
        ],
        document,
    ))
}

/// Replaces the ledger with an uploaded backup document
pub async fn restore_backup(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<RestoreResponse>, ApiError> {
    let payload = state
        .ledger
        .lock()
        .await
        .restore_backup(&body, &mut RandomIdGenerator)?;
    Ok(Json(RestoreResponse::new(&payload, None)))
}

/// Saves the ledger to the backup store
pub async fn save_to_cloud(
    State(state): State<AppState>,
    request: Option<Json<CloudSaveRequest>>,
) -> Result<Json<CloudSaveResponse>, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let document = state.ledger.lock().await.backup_document()?;

    let existing = request
        .id
        .as_deref()
        .and_then(normalize_backup_id)
        .zip(request.edit_key.filter(|k| !k.trim().is_empty()));

    let response = match existing {
        Some((id, edit_key)) => {
            state.backups.update(&id, &edit_key, &document).await?;
            CloudSaveResponse {
                id,
                edit_key,
                created: false,
            }
        }
        None => {
            let handle = state.backups.create(&document).await?;
            CloudSaveResponse {
                id: handle.id,
                edit_key: handle.edit_key,
                created: true,
            }
        }
    };

    info!(backup_id = %response.id, created = response.created, "Backup saved");
    Ok(Json(response))
}

/// Fetches a backup by id or share URL and restores it
pub async fn load_from_cloud(
    State(state): State<AppState>,
    Json(request): Json<CloudLoadRequest>,
) -> Result<Json<RestoreResponse>, ApiError> {
    let id = normalize_backup_id(&request.id)
        .ok_or_else(|| ApiError::BadRequest("Backup id is empty".to_string()))?;

    let Some(document) = state.backups.fetch(&id).await? else {
        warn!(backup_id = %id, "Backup not found");
        return Err(ApiError::NotFound(format!("Backup not found: {}", id)));
    };

    let payload = state
        .ledger
        .lock()
        .await
        .restore_backup(&document, &mut RandomIdGenerator)?;
    Ok(Json(RestoreResponse::new(&payload, Some(id))))
}
