//! API configuration

use serde::Deserialize;

use core_kernel::CoreError;
use domain_metering::{ImportLimits, LedgerConfig, UndoConfig};

const FIVE_MIB: usize = 5 * 1024 * 1024;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory holding the bills and settings files
    pub data_dir: String,
    /// Directory holding backup documents
    pub backup_dir: String,
    /// Byte quota for the data directory
    pub storage_quota_bytes: usize,
    /// Largest accepted request body (CSV uploads, backup documents)
    pub max_upload_bytes: usize,
    /// Deletions kept for undo
    pub undo_depth: usize,
    /// Seconds an undo offer stays valid
    pub undo_window_secs: i64,
    /// Log level
    pub log_level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            data_dir: "./data".to_string(),
            backup_dir: "./data/backups".to_string(),
            storage_quota_bytes: FIVE_MIB,
            max_upload_bytes: FIVE_MIB,
            undo_depth: 10,
            undo_window_secs: 10,
            log_level: "info".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `METER_*` environment variables
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("METER"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rejects settings the server cannot run with
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.data_dir.trim().is_empty() {
            return Err(CoreError::configuration("data_dir must not be empty"));
        }
        if self.backup_dir.trim().is_empty() {
            return Err(CoreError::configuration("backup_dir must not be empty"));
        }
        if self.storage_quota_bytes == 0 || self.max_upload_bytes == 0 {
            return Err(CoreError::configuration("byte limits must be greater than zero"));
        }
        if self.undo_window_secs < 0 {
            return Err(CoreError::configuration("undo_window_secs must not be negative"));
        }
        Ok(())
    }

    /// Ledger settings derived from this configuration
    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            undo: UndoConfig {
                depth: self.undo_depth,
                window: chrono::Duration::seconds(self.undo_window_secs.max(0)),
            },
            import_limits: ImportLimits {
                max_file_bytes: self.max_upload_bytes,
                ..ImportLimits::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_ledger_defaults() {
        let config = ApiConfig::default();
        let ledger = config.ledger_config();

        assert_eq!(ledger.undo, UndoConfig::default());
        assert_eq!(ledger.import_limits, ImportLimits::default());
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_negative_window_is_clamped() {
        let config = ApiConfig {
            undo_window_secs: -5,
            ..ApiConfig::default()
        };
        assert_eq!(config.ledger_config().undo.window, chrono::Duration::zero());
        assert!(matches!(config.validate(), Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_blank_data_dir_rejected() {
        let config = ApiConfig {
            data_dir: "  ".to_string(),
            ..ApiConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(ApiConfig::default().validate().is_ok());
    }
}
