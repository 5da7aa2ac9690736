//! Local key-value store port
//!
//! The ledger persists itself as two JSON strings under fixed keys. Any
//! string store that can report a quota failure distinctly can back it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Key holding the JSON array of bills
pub const BILLS_KEY: &str = "elecBills";

/// Key holding the JSON object of baseline settings
pub const SETTINGS_KEY: &str = "elecSettings";

/// Errors reported by a [`KeyValueStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the store's capacity
    #[error("Storage quota exceeded writing '{key}': {needed} bytes needed, limit is {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Any other read or write failure
    #[error("Storage I/O error on '{key}': {message}")]
    Io { key: String, message: String },
}

impl StoreError {
    pub fn io(key: impl Into<String>, error: impl std::fmt::Display) -> Self {
        StoreError::Io {
            key: key.into(),
            message: error.to_string(),
        }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, StoreError::QuotaExceeded { .. })
    }
}

/// String key-value persistence used by the ledger
pub trait KeyValueStore: Send {
    /// Reads the value under `key`, `None` when absent
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Writes `value` under `key`, replacing any previous value
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Deletes `key`; removing an absent key is not an error
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store with an optional byte quota
///
/// Clones share the same underlying map, which lets a test keep a handle to
/// inspect what the ledger wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once the total stored bytes would exceed `limit`
    pub fn with_quota(limit: usize) -> Self {
        Self {
            entries: Arc::default(),
            quota: Some(limit),
        }
    }

    /// Changes the quota for this handle
    pub fn set_quota(&mut self, quota: Option<usize>) {
        self.quota = quota;
    }

    /// Raw value under `key`
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    /// Seeds a value without quota checks
    pub fn insert(&self, key: &str, value: impl Into<String>) {
        self.entries().insert(key.to_string(), value.into());
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.get(key))
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries();
        if let Some(limit) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_remove() {
        let mut store = MemoryStore::new();
        store.save(BILLS_KEY, "[]").unwrap();
        assert_eq!(store.load(BILLS_KEY).unwrap().as_deref(), Some("[]"));

        store.remove(BILLS_KEY).unwrap();
        assert!(store.load(BILLS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_quota_counts_other_keys() {
        let mut store = MemoryStore::with_quota(40);
        store.save(SETTINGS_KEY, r#"{"top":1,"bottom":2}"#).unwrap();

        let err = store.save(BILLS_KEY, "[1,2,3]").unwrap_err();
        assert!(err.is_quota_exceeded());
        assert!(store.load(BILLS_KEY).unwrap().is_none());
    }
}
