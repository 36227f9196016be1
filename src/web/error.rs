//! API error handling for the Filedrop HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::FiledropError;

/// API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed or empty request (400).
    InvalidRequest,
    /// Content type not allowed (400).
    UnsupportedType,
    /// File over the size limit (400).
    TooLarge,
    /// Batch over the count limit (400).
    TooManyFiles,
    /// Unknown id or missing blob (404).
    NotFound,
    /// Blob store failure (500).
    StorageError,
    /// Catalog failure (500).
    CatalogError,
    /// Any other server failure (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest
            | ErrorCode::UnsupportedType
            | ErrorCode::TooLarge
            | ErrorCode::TooManyFiles => StatusCode::BAD_REQUEST,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::StorageError | ErrorCode::CatalogError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// API error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Error details.
    pub error: ErrorDetail,
}

/// Error detail.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    code: ErrorCode,
    message: String,
}

impl ApiError {
    /// Create a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create a not found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Create an internal server error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message sent to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<FiledropError> for ApiError {
    fn from(err: FiledropError) -> Self {
        if err.is_client_error() {
            tracing::debug!("Rejected request: {}", err);
        }
        match err {
            FiledropError::InvalidRequest(msg) => ApiError::invalid_request(msg),
            FiledropError::UnsupportedType { name, mime_type } => ApiError::new(
                ErrorCode::UnsupportedType,
                format!("Unsupported file type '{mime_type}' for {name}"),
            ),
            FiledropError::TooLarge { name, limit } => ApiError::new(
                ErrorCode::TooLarge,
                format!("File {name} is too large (max {}MB)", limit / 1024 / 1024),
            ),
            FiledropError::TooManyFiles(max) => ApiError::new(
                ErrorCode::TooManyFiles,
                format!("Too many files (max {max} per upload)"),
            ),
            FiledropError::NotFound(_) => ApiError::not_found("File not found"),
            FiledropError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                ApiError::new(ErrorCode::StorageError, "Failed to access file storage")
            }
            FiledropError::Catalog(msg) => {
                tracing::error!("Catalog error: {}", msg);
                ApiError::new(ErrorCode::CatalogError, "Failed to access file catalog")
            }
            other => {
                tracing::error!("Internal error: {}", other);
                ApiError::internal("An internal error occurred")
            }
        }
    }
}
