//! Backup DTOs

use serde::{Deserialize, Serialize};

use domain_metering::BackupPayload;

/// Save the ledger to the backup store
///
/// With both `id` and `editKey` the existing backup is overwritten,
/// otherwise a new one is created.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSaveRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub edit_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSaveResponse {
    pub id: String,
    pub edit_key: String,
    pub created: bool,
}

/// Load a backup by bare id or pasted share URL
#[derive(Debug, Clone, Deserialize)]
pub struct CloudLoadRequest {
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub bill_count: usize,
    pub baseline_set: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_id: Option<String>,
}

impl RestoreResponse {
    pub fn new(payload: &BackupPayload, backup_id: Option<String>) -> Self {
        Self {
            bill_count: payload.bills.len(),
            baseline_set: payload.settings.is_set(),
            backup_id,
        }
    }
}
