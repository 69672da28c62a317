//! Error types for agent-quota
//!
//! The usage tracker itself never fails. These errors cover the layers
//! around it: sessions turning a violation into a hard stop, token
//! counting, and reading usage records.

use serde::Serialize;
use thiserror::Error;

use crate::quota::{QuotaDimension, QuotaViolation};

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        dimension: QuotaDimension,
        message: String,
        limit: u64,
        used: u64,
    },

    #[error("Invalid usage record on line {line}: {message}")]
    InvalidUsageRecord { line: usize, message: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<QuotaViolation> for AppError {
    fn from(violation: QuotaViolation) -> Self {
        AppError::QuotaExceeded {
            dimension: violation.dimension(),
            message: violation.reason(),
            limit: violation.limit(),
            used: violation.used(),
        }
    }
}

/// Serializable error description
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Additional error details for quota violations
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub dimension: QuotaDimension,
    pub limit: u64,
    pub used: u64,
}

impl AppError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::InvalidUsageRecord { .. } => "INVALID_USAGE_RECORD",
            AppError::Tokenizer(_) => "TOKENIZER_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::JsonError(_) => "INVALID_JSON",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True when the error is a quota stop rather than a fault
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, AppError::QuotaExceeded { .. })
    }

    /// Build the serializable body for this error
    pub fn body(&self) -> ErrorBody {
        let (message, details) = match self {
            AppError::QuotaExceeded {
                dimension,
                message,
                limit,
                used,
            } => (
                message.clone(),
                Some(ErrorDetails {
                    dimension: *dimension,
                    limit: *limit,
                    used: *used,
                }),
            ),
            AppError::Internal(_) => ("Internal error".to_string(), None),
            other => (other.to_string(), None),
        };

        ErrorBody {
            code: self.code().to_string(),
            message,
            details,
        }
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
