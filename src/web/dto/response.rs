//! Response DTOs for the Filedrop API.

use serde::Serialize;
use utoipa::ToSchema;

use crate::file::FileRecord;

/// Response of a successful upload.
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Human-readable summary.
    pub message: String,
    /// Number of files stored.
    pub count: usize,
    /// Records of the stored files.
    pub files: Vec<FileRecord>,
}

impl UploadResponse {
    /// Create an upload response for the stored records.
    pub fn new(files: Vec<FileRecord>) -> Self {
        Self {
            message: "Files uploaded successfully".to_string(),
            count: files.len(),
            files,
        }
    }
}

/// Plain message response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
