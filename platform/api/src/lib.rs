use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

/// Shared result type for data-layer operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::IntegrityViolation(_) => "INTEGRITY_VIOLATION",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        Self::IntegrityViolation(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }

    /// Machine-readable form for JSON output. Internal causes stay hidden.
    pub fn payload(&self) -> ErrorPayload {
        ErrorPayload {
            code: self.code(),
            message: self.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}
