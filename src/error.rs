use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::processor::ProcessingError;
use crate::record::ValidationError;
use crate::storage::StorageError;

/// Errors surfaced at the HTTP boundary.
///
/// Every variant renders as `{"error": "<message>"}` with its status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Failed to process submission")]
    Processing(#[source] ProcessingError),

    #[error("Server busy, try again later")]
    Overloaded(#[source] ProcessingError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl ApiError {
    pub fn not_found() -> Self {
        Self::NotFound("Record not found".to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Processing(_) | Self::Storage(_) | Self::InvalidPattern(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<ProcessingError> for ApiError {
    fn from(err: ProcessingError) -> Self {
        match err {
            ProcessingError::Saturated(_) => Self::Overloaded(err),
            other => Self::Processing(other),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            Self::Processing(source) | Self::Overloaded(source) => {
                warn!("{}: {}", self, source)
            }
            Self::Storage(_) => warn!("Storage failure: {}", self),
            Self::InvalidPattern(_) => warn!("{}", self),
            Self::NotFound(_) | Self::Validation(_) => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
