//! Error types for Filedrop.

use thiserror::Error;

/// Common error type for Filedrop.
#[derive(Error, Debug)]
pub enum FiledropError {
    /// Malformed or empty upload request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Declared content type is not in the allow-list.
    #[error("unsupported file type: {mime_type} ({name})")]
    UnsupportedType {
        /// Client-supplied filename.
        name: String,
        /// Declared (or guessed) content type.
        mime_type: String,
    },

    /// A single file exceeds the configured size limit.
    #[error("file too large: {name} exceeds {limit} bytes")]
    TooLarge {
        /// Client-supplied filename.
        name: String,
        /// Configured limit in bytes.
        limit: u64,
    },

    /// The batch has more files than allowed.
    #[error("too many files: at most {0} per upload")]
    TooManyFiles(usize),

    /// Unknown id, or a catalog entry whose blob is gone.
    #[error("{0} not found")]
    NotFound(String),

    /// Blob store I/O failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Catalog read, write or serialization failure.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FiledropError {
    /// Whether this error was caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FiledropError::InvalidRequest(_)
                | FiledropError::UnsupportedType { .. }
                | FiledropError::TooLarge { .. }
                | FiledropError::TooManyFiles(_)
                | FiledropError::NotFound(_)
        )
    }
}

impl From<serde_json::Error> for FiledropError {
    fn from(e: serde_json::Error) -> Self {
        FiledropError::Catalog(e.to_string())
    }
}

/// Result type alias for Filedrop operations.
pub type Result<T> = std::result::Result<T, FiledropError>;
