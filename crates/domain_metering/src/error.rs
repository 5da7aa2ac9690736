//! Metering domain errors

use thiserror::Error;

use core_kernel::BillId;

use crate::backup::BackupError;
use crate::interchange::CsvError;
use crate::store::StoreError;
use crate::validation::ValidationIssue;

/// Errors that can occur while operating on the ledger
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The proposed values were rejected; nothing was changed
    #[error("Validation failed: {}", join_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// No bill carries this id
    #[error("Bill not found: {id}")]
    NotFound { id: BillId },

    /// An id collided with an existing bill
    #[error("Duplicate bill id: {id}")]
    DuplicateId { id: BillId },

    /// The change is applied in memory but could not be persisted
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    StorageQuota {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// A backup document failed structural checks
    #[error(transparent)]
    MalformedBackup(#[from] BackupError),

    /// Baseline readings have not been supplied yet
    #[error("Baseline readings are not set")]
    BaselineNotSet,

    /// The undo offer's window has closed
    #[error("Undo window has expired")]
    UndoExpired,

    /// Nothing to undo, or the offer was superseded
    #[error("No pending operation to undo")]
    NoPendingUndo,

    /// Stored JSON could not be decoded
    #[error("Stored data under '{key}' is corrupt: {source}")]
    CorruptStore {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Any other persistence failure
    #[error("Storage error: {0}")]
    Store(StoreError),

    /// CSV input could not be read
    #[error(transparent)]
    Csv(#[from] CsvError),
}

impl LedgerError {
    /// Issues behind a validation failure, empty for other errors
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            LedgerError::Validation(issues) => issues,
            _ => &[],
        }
    }

    /// True when the in-memory state changed but persisting it failed
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, LedgerError::StorageQuota { .. } | LedgerError::Store(_))
    }
}

impl From<StoreError> for LedgerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::QuotaExceeded { key, needed, limit } => {
                LedgerError::StorageQuota { key, needed, limit }
            }
            other => LedgerError::Store(other),
        }
    }
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_maps_to_storage_quota() {
        let error: LedgerError = StoreError::QuotaExceeded {
            key: "elecBills".into(),
            needed: 10,
            limit: 5,
        }
        .into();

        assert!(matches!(error, LedgerError::StorageQuota { ref key, .. } if key == "elecBills"));
        assert!(error.is_persistence_failure());
    }

    #[test]
    fn test_validation_message_lists_issues() {
        let error = LedgerError::Validation(vec![
            ValidationIssue::DateMissing,
            ValidationIssue::KwhNotPositive,
        ]);
        let message = error.to_string();

        assert!(message.contains("date is missing"));
        assert!(message.contains("; total kWh"));
        assert_eq!(error.issues().len(), 2);
    }
}
