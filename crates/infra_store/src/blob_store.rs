//! Directory-backed backup blob store
//!
//! Each backup is an envelope file `<root>/<id>.json` holding the document
//! together with the edit key required to overwrite it. Ids and edit keys
//! are random alphanumeric strings, so pasted ids survive URL extraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
use domain_metering::{BackupBlobStore, BackupHandle};

use crate::error::StorageError;

const ADAPTER_ID: &str = "directory-blob-store";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    edit_key: String,
    updated_at: DateTime<Utc>,
    data: String,
}

/// Backup documents kept as files in a directory
#[derive(Debug, Clone)]
pub struct DirectoryBlobStore {
    root: PathBuf,
}

impl DirectoryBlobStore {
    /// Opens (creating if needed) the backup directory
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| StorageError::io(&root, e))?;
        debug!(root = %root.display(), "Blob store opened");
        Ok(Self { root })
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StorageError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidKey(id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    async fn read_envelope(&self, id: &str) -> Result<Option<Envelope>, StorageError> {
        let path = self.path_for(id)?;
        match fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    async fn write_envelope(&self, id: &str, envelope: &Envelope) -> Result<(), StorageError> {
        let path = self.path_for(id)?;
        let tmp = path.with_extension("json.tmp");
        let raw = serde_json::to_string(envelope)?;
        fs::write(&tmp, raw).await.map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::io(&path, e))
    }
}

fn random_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl DomainPort for DirectoryBlobStore {}

#[async_trait]
impl BackupBlobStore for DirectoryBlobStore {
    #[instrument(skip(self))]
    async fn fetch(&self, id: &str) -> Result<Option<String>, PortError> {
        let envelope = self.read_envelope(id).await?;
        debug!(found = envelope.is_some(), "Fetched backup");
        Ok(envelope.map(|e| e.data))
    }

    #[instrument(skip(self, payload), fields(bytes = payload.len()))]
    async fn create(&self, payload: &str) -> Result<BackupHandle, PortError> {
        let handle = BackupHandle {
            id: random_token(),
            edit_key: random_token(),
        };
        let envelope = Envelope {
            edit_key: handle.edit_key.clone(),
            updated_at: Utc::now(),
            data: payload.to_string(),
        };
        self.write_envelope(&handle.id, &envelope).await?;
        info!(backup_id = %handle.id, "Backup created");
        Ok(handle)
    }

    #[instrument(skip(self, edit_key, payload), fields(bytes = payload.len()))]
    async fn update(&self, id: &str, edit_key: &str, payload: &str) -> Result<(), PortError> {
        let existing = self
            .read_envelope(id)
            .await?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        if existing.edit_key != edit_key {
            warn!(backup_id = %id, "Backup update with wrong edit key");
            return Err(StorageError::EditKeyMismatch(id.to_string()).into());
        }

        let envelope = Envelope {
            edit_key: existing.edit_key,
            updated_at: Utc::now(),
            data: payload.to_string(),
        };
        self.write_envelope(id, &envelope).await?;
        info!(backup_id = %id, "Backup updated");
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for DirectoryBlobStore {
    /// Checks that the backup directory is still there
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = fs::metadata(&self.root).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(meta) if meta.is_dir() && !meta.permissions().readonly() => (AdapterHealth::Healthy, None),
            Ok(meta) if meta.is_dir() => (
                AdapterHealth::Degraded,
                Some("Backup directory is read-only".to_string()),
            ),
            Ok(_) => (
                AdapterHealth::Unhealthy,
                Some("Backup path is not a directory".to_string()),
            ),
            Err(e) => (
                AdapterHealth::Unhealthy,
                Some(format!("Backup directory error: {}", e)),
            ),
        };

        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}
