//! File management module for Filedrop.
//!
//! This module provides file upload/download functionality including:
//! - Blob storage with UUID naming
//! - A JSON catalog of file metadata behind the [`Catalog`] trait
//! - Upload validation (content type, size, count)
//! - The [`FileService`] used by the HTTP handlers

mod catalog;
mod metadata;
mod service;
mod storage;
mod upload;
mod validation;

pub use catalog::{Catalog, JsonCatalog};
pub use metadata::{FileRecord, NewFile, DEFAULT_MIME_TYPE};
pub use service::{Download, FileService};
pub use storage::{Blob, BlobStore, BlobWriter};
pub use upload::UploadBatch;
pub use validation::{AllowList, UploadLimits};

/// Extra request body allowance for multipart framing.
pub const MULTIPART_OVERHEAD: u64 = 1024 * 1024;
