//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use core_kernel::{CoreError, PortError};
use domain_metering::{LedgerError, ValidationIssue};

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        issues: Vec<ValidationIssue>,
    },

    /// The change was applied but could not be saved
    #[error("Insufficient storage: {0}")]
    InsufficientStorage(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<IssueDetail>>,
}

/// One validation issue, with the input field it belongs to
#[derive(Debug, Serialize)]
pub struct IssueDetail {
    pub field: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub issue: ValidationIssue,
}

impl From<&ValidationIssue> for IssueDetail {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            field: issue.field(),
            message: issue.to_string(),
            issue: issue.clone(),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Gone(_) => StatusCode::GONE,
            ApiError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InsufficientStorage(_) => StatusCode::INSUFFICIENT_STORAGE,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg, None),
            ApiError::BadRequest(msg) => ("bad_request", msg, None),
            ApiError::Forbidden(msg) => ("forbidden", msg, None),
            ApiError::Conflict(msg) => ("conflict", msg, None),
            ApiError::Gone(msg) => ("gone", msg, None),
            ApiError::Validation { message, issues } => (
                "validation_error",
                message,
                Some(issues.iter().map(IssueDetail::from).collect()),
            ),
            ApiError::InsufficientStorage(msg) => ("storage_quota_exceeded", msg, None),
            ApiError::Unavailable(msg) => ("unavailable", msg, None),
            ApiError::Internal(msg) => ("internal_error", msg, None),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::Validation(issues) => ApiError::Validation { message, issues },
            LedgerError::NotFound { .. } => ApiError::NotFound(message),
            LedgerError::StorageQuota { .. } => ApiError::InsufficientStorage(message),
            LedgerError::MalformedBackup(_) | LedgerError::Csv(_) => ApiError::BadRequest(message),
            LedgerError::UndoExpired => ApiError::Gone(message),
            LedgerError::BaselineNotSet | LedgerError::NoPendingUndo => ApiError::Conflict(message),
            LedgerError::DuplicateId { .. }
            | LedgerError::CorruptStore { .. }
            | LedgerError::Store(_) => {
                error!(error = %message, "Ledger failure");
                ApiError::Internal(message)
            }
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        let message = err.to_string();
        match err {
            PortError::NotFound { .. } => ApiError::NotFound(message),
            PortError::Validation { .. } => ApiError::BadRequest(message),
            PortError::Unauthorized { .. } => ApiError::Forbidden(message),
            PortError::Unavailable { .. } => ApiError::Unavailable(message),
            PortError::Internal { .. } => {
                error!(error = %message, "Backup store failure");
                ApiError::Internal(message)
            }
        }
    }
}
