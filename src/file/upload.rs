//! Upload pipeline.
//!
//! An [`UploadBatch`] receives the files of one upload request one at a
//! time, validates each against the [`UploadLimits`](super::UploadLimits),
//! streams it into the blob store and, on [`UploadBatch::commit`], appends
//! all records to the catalog in a single write.
//!
//! A batch that is dropped before [`UploadBatch::commit`] removes every
//! blob it wrote, so a rejected or interrupted upload leaves neither blobs
//! nor catalog entries behind. Once commit starts, the blobs belong to the
//! catalog write: they are removed only if the append itself fails.

use chrono::Utc;
use uuid::Uuid;

use super::metadata::FileRecord;
use super::service::FileService;
use super::storage::{BlobStore, BlobWriter};
use super::validation::UploadLimits;
use crate::{FiledropError, Result};

/// File currently being received.
struct PendingFile {
    id: String,
    name: String,
    mime_type: String,
    stored_name: String,
    writer: BlobWriter,
}

/// One upload request in progress.
pub struct UploadBatch {
    service: FileService,
    current: Option<PendingFile>,
    stored: Vec<FileRecord>,
    seen: usize,
}

impl UploadBatch {
    pub(super) fn new(service: FileService) -> Self {
        Self {
            service,
            current: None,
            stored: Vec::new(),
            seen: 0,
        }
    }

    /// Begin receiving a file.
    ///
    /// Checks the content type, then the batch size, and opens the blob.
    pub async fn start_file(&mut self, name: &str, declared_type: Option<&str>) -> Result<()> {
        if self.current.is_some() {
            return Err(FiledropError::InvalidRequest(
                "previous file is still being received".to_string(),
            ));
        }

        let limits = self.service.limits();
        let mime_type = UploadLimits::resolve_content_type(name, declared_type);
        limits.check_type(name, &mime_type)?;

        self.seen += 1;
        limits.check_count(self.seen)?;

        let id = Uuid::new_v4().to_string();
        let stored_name = BlobStore::stored_name_for(&id, name);
        let writer = self.service.storage().create(&stored_name).await?;

        tracing::debug!(id = %id, name = %name, mime_type = %mime_type, "Receiving file");

        self.current = Some(PendingFile {
            id,
            name: name.to_string(),
            mime_type,
            stored_name,
            writer,
        });
        Ok(())
    }

    /// Append a chunk to the file being received.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let limits = self.service.limits();
        let file = self.current.as_mut().ok_or_else(|| {
            FiledropError::InvalidRequest("no file is being received".to_string())
        })?;

        limits.check_size(&file.name, file.writer.written() + chunk.len() as u64)?;
        file.writer.write(chunk).await
    }

    /// Complete the file being received and move its blob into place.
    pub async fn finish_file(&mut self) -> Result<()> {
        let file = self.current.take().ok_or_else(|| {
            FiledropError::InvalidRequest("no file is being received".to_string())
        })?;

        let size = file.writer.commit().await?;
        self.stored.push(FileRecord {
            id: file.id,
            name: file.name,
            stored_name: file.stored_name,
            size,
            mime_type: Some(file.mime_type),
            uploaded_at: Utc::now(),
        });
        Ok(())
    }

    /// Number of files received completely so far.
    pub fn len(&self) -> usize {
        self.stored.len()
    }

    /// Whether no file has been received completely yet.
    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    /// Record every received file in the catalog.
    ///
    /// The blobs are handed to the blocking catalog task together with the
    /// records. That task removes them if the append fails, and keeps them
    /// once the append succeeds even if the caller has gone away.
    pub async fn commit(mut self) -> Result<Vec<FileRecord>> {
        if self.current.is_some() {
            return Err(FiledropError::InvalidRequest(
                "upload ended in the middle of a file".to_string(),
            ));
        }
        if self.stored.is_empty() {
            return Err(FiledropError::InvalidRequest("No files uploaded".to_string()));
        }

        let records = std::mem::take(&mut self.stored);
        let pending = records.clone();
        let storage = self.service.storage().clone();
        self.service
            .catalog_call(move |catalog| {
                catalog.append(&pending).inspect_err(|e| {
                    let removed = remove_blobs(&storage, &pending);
                    tracing::warn!(
                        error = %e,
                        removed,
                        "Catalog append failed, upload rolled back"
                    );
                })
            })
            .await?;

        tracing::info!(count = records.len(), "Upload accepted");
        Ok(records)
    }
}

/// Delete the blobs of `records`, returning how many were removed.
fn remove_blobs(storage: &BlobStore, records: &[FileRecord]) -> usize {
    records
        .iter()
        .filter(|r| storage.delete_blocking(&r.stored_name))
        .count()
}

/// Rolls back files received before commit.
///
/// Removal is synchronous, at most `max_files` unlinks on the dropping
/// thread.
impl Drop for UploadBatch {
    fn drop(&mut self) {
        if self.stored.is_empty() {
            return;
        }
        let removed = remove_blobs(self.service.storage(), &self.stored);
        tracing::debug!(removed, "Rolled back blobs of an unfinished upload");
    }
}
