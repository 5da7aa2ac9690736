//! Ports and Adapters Infrastructure
//!
//! This module provides the foundational types for the ports-and-adapters
//! split between the metering domain and its collaborators.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Interface Layer                          │
//! │                 (HTTP handlers, server binary)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Port Traits                             │
//! │        (KeyValueStore, BackupBlobStore, Clock)               │
//! │   Defined in the domain, depend only on core_kernel          │
//! └─────────────────────────────────────────────────────────────┘
//!                    ▲                         ▲
//!                    │                         │
//!         ┌─────────┴─────────┐     ┌────────┴────────┐
//!         │  In-memory Adapter │     │   File Adapter   │
//!         │   (tests, demos)   │     │  (infra_store)   │
//!         └───────────────────┘     └──────────────────┘
//! ```

use std::fmt;
use thiserror::Error;
use serde::{Deserialize, Serialize};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Failure reported by an asynchronous collaborator such as the backup store
#[derive(Debug, Error)]
pub enum PortError {
    #[error("Not found: {entity_type} with id {id}")]
    NotFound {
        entity_type: String,
        id: String,
    },

    /// The request was rejected before reaching storage
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// The caller lacks the secret needed for this change
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
    },

    /// The collaborator could not be reached; retrying may help
    #[error("Unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl PortError {
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        PortError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        }
    }

    /// Validation failure tied to one request field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        PortError::Unauthorized {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        PortError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Internal failure keeping the underlying error as its source
    pub fn internal_with(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PortError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, PortError::Unavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PortError::NotFound { .. })
    }
}

/// Marker for collaborator traits, which are shared across async tasks
pub trait DomainPort: Send + Sync + 'static {}

/// Coarse state of an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    Healthy,
    /// Serving reads but not writes
    Degraded,
    Unhealthy,
}

/// Outcome of probing one adapter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub adapter_id: String,
    pub status: AdapterHealth,
    pub latency_ms: u64,
    /// Why the adapter is not healthy, when it is not
    pub message: Option<String>,
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

/// Adapters that can probe their own backing resource
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_entity_and_id() {
        let error = PortError::not_found("Backup", "abc123");
        assert!(error.is_not_found());
        assert!(!error.is_retryable());
        assert_eq!(error.to_string(), "Not found: Backup with id abc123");
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(PortError::unavailable("backup host down").is_retryable());
        assert!(!PortError::unauthorized("edit key mismatch").is_retryable());
        assert!(!PortError::validation_field("bad id", "id").is_retryable());
    }

    #[test]
    fn test_internal_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let error = PortError::internal_with("Backup storage failed", io);
        let source = std::error::Error::source(&error).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("disk full"));
    }
}
