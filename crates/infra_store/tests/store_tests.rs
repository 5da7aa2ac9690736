//! Tests for the file-backed stores

use std::sync::Arc;

use core_kernel::{AdapterHealth, HealthCheckable, ManualClock, PortError};
use domain_metering::{
    BackupBlobStore, BaselineSettings, KeyValueStore, Ledger, LedgerConfig, LedgerError,
    RandomIdGenerator, BILLS_KEY, SETTINGS_KEY,
};
use infra_store::{DirectoryBlobStore, FileStore};

// ============================================================================
// File Store Tests
// ============================================================================

mod file_store_tests {
    use super::*;

    #[test]
    fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path(), 1024).unwrap();

        assert!(store.load(BILLS_KEY).unwrap().is_none());
        store.save(BILLS_KEY, "[]").unwrap();
        assert_eq!(store.load(BILLS_KEY).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("elecBills.json").exists());

        store.remove(BILLS_KEY).unwrap();
        store.remove(BILLS_KEY).unwrap();
        assert!(store.load(BILLS_KEY).unwrap().is_none());
    }

    #[test]
    fn test_overwrite_does_not_double_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path(), 20).unwrap();

        // "elecBills" is 9 bytes, leaving 11 for the value
        store.save(BILLS_KEY, "x".repeat(11).as_str()).unwrap();
        store.save(BILLS_KEY, "y".repeat(11).as_str()).unwrap();

        let err = store.save(BILLS_KEY, "z".repeat(12).as_str()).unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.load(BILLS_KEY).unwrap(), Some("y".repeat(11)));
    }

    #[test]
    fn test_ledger_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));

        let store = FileStore::open(dir.path(), 1024 * 1024).unwrap();
        let mut ledger = Ledger::open(store, LedgerConfig::default(), clock.clone()).unwrap();
        ledger.set_baseline(test_utils::BillFixtures::baseline()).unwrap();
        let bill = ledger
            .insert(test_utils::BillFixtures::january(), &mut RandomIdGenerator)
            .unwrap();

        let store = FileStore::open(dir.path(), 1024 * 1024).unwrap();
        let reopened = Ledger::open(store, LedgerConfig::default(), clock).unwrap();
        assert_eq!(reopened.bills(), vec![bill]);
        assert_eq!(reopened.baseline(), test_utils::BillFixtures::baseline());
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("elecSettings.json"), "not json").unwrap();

        let store = FileStore::open(dir.path(), 1024).unwrap();
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let result = Ledger::open(store, LedgerConfig::default(), clock);

        match result {
            Err(LedgerError::CorruptStore { key, .. }) => assert_eq!(key, SETTINGS_KEY),
            other => panic!("Expected corrupt store, got {:?}", other.map(|l| l.len())),
        }
    }

    #[test]
    fn test_clear_all_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path(), 1024 * 1024).unwrap();
        let clock = Arc::new(ManualClock::new(chrono::Utc::now()));
        let mut ledger = Ledger::open(store, LedgerConfig::default(), clock).unwrap();
        ledger.set_baseline(BaselineSettings::unset()).unwrap();
        assert!(dir.path().join("elecSettings.json").exists());

        ledger.clear_all().unwrap();
        assert!(!dir.path().join("elecSettings.json").exists());
    }
}

// ============================================================================
// Blob Store Tests
// ============================================================================

mod blob_store_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirectoryBlobStore::open(dir.path()).await.unwrap();

        let handle = blobs.create(r#"{"bills":[]}"#).await.unwrap();
        assert!(handle.id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(handle.id, handle.edit_key);

        let fetched = blobs.fetch(&handle.id).await.unwrap();
        assert_eq!(fetched.as_deref(), Some(r#"{"bills":[]}"#));
    }

    #[tokio::test]
    async fn test_update_requires_edit_key() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirectoryBlobStore::open(dir.path()).await.unwrap();
        let handle = blobs.create("[]").await.unwrap();

        let err = blobs.update(&handle.id, "wrong", "[1]").await.unwrap_err();
        assert!(matches!(err, PortError::Unauthorized { .. }));

        blobs.update(&handle.id, &handle.edit_key, "[2]").await.unwrap();
        assert_eq!(blobs.fetch(&handle.id).await.unwrap().as_deref(), Some("[2]"));
    }

    #[tokio::test]
    async fn test_unknown_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirectoryBlobStore::open(dir.path()).await.unwrap();

        assert!(blobs.fetch("abc123").await.unwrap().is_none());
        assert!(blobs.update("abc123", "k", "[]").await.unwrap_err().is_not_found());
        assert!(matches!(
            blobs.fetch("../secret").await.unwrap_err(),
            PortError::Validation { .. }
        ));
    }

    #[tokio::test]
    async fn test_health_check_reports_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = DirectoryBlobStore::open(dir.path().join("backups")).await.unwrap();

        let healthy = blobs.health_check().await;
        assert_eq!(healthy.status, AdapterHealth::Healthy);

        std::fs::remove_dir_all(dir.path().join("backups")).unwrap();
        let gone = blobs.health_check().await;
        assert_eq!(gone.status, AdapterHealth::Unhealthy);
    }
}
