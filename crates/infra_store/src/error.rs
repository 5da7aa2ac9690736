//! Storage error types
//!
//! Errors raised by the file-backed adapters, with conversions into the
//! domain's store error and the shared port error.

use std::path::PathBuf;
use thiserror::Error;

use core_kernel::PortError;
use domain_metering::StoreError;

/// Errors that can occur in the file-backed stores
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The key or id contains characters not allowed in a file name
    #[error("Invalid key: '{0}'")]
    InvalidKey(String),

    /// The write would push the directory past its byte quota
    #[error("Quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// No backup with this id
    #[error("Backup not found: {0}")]
    NotFound(String),

    /// The edit key does not match the stored one
    #[error("Edit key does not match backup {0}")]
    EditKeyMismatch(String),

    /// A stored envelope could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }

    /// Checks if this error indicates the target does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::QuotaExceeded { key, needed, limit } => {
                StoreError::QuotaExceeded { key, needed, limit }
            }
            StorageError::Io { ref path, .. } => {
                let key = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                StoreError::io(key, &error)
            }
            StorageError::InvalidKey(ref key) => StoreError::io(key.clone(), &error),
            other => StoreError::io("", other),
        }
    }
}

impl From<StorageError> for PortError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(id) => PortError::not_found("Backup", id),
            StorageError::EditKeyMismatch(_) => PortError::unauthorized(error.to_string()),
            StorageError::InvalidKey(_) => PortError::validation_field(error.to_string(), "id"),
            other => PortError::internal_with("Backup storage failed", other),
        }
    }
}
