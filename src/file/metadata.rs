//! File metadata types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Content type used when a record carries none.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// One catalog entry per stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Opaque identifier used for download and delete.
    pub id: String,
    /// Original client-supplied filename.
    pub name: String,
    /// Name of the blob on disk.
    pub stored_name: String,
    /// Size in bytes, recorded at upload time.
    pub size: u64,
    /// Declared content type at upload time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Acceptance timestamp (UTC).
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Content type to serve this file with.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE)
    }
}

/// An in-memory file to upload, for callers outside of HTTP.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Original filename.
    pub name: String,
    /// Declared content type, if any.
    pub content_type: Option<String>,
    /// File content.
    pub content: Bytes,
}

impl NewFile {
    /// Create a new file with no declared content type.
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            content: content.into(),
        }
    }

    /// Set the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}
