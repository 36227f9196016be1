//! Blob storage for Filedrop.
//!
//! This module provides physical file storage functionality:
//! - UUID-based file naming that keeps the original extension
//! - Directory sharding by first 2 characters of the stored name
//! - Streaming writes through a `.part` file renamed into place on commit
//! - Open, delete and startup sweep of interrupted writes

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{FiledropError, Result};

/// Suffix of in-progress blob writes.
const PARTIAL_SUFFIX: &str = ".part";

/// Longest extension carried over from a client filename.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Blob store managing the uploaded file contents.
///
/// Files are stored in a sharded directory structure:
/// ```text
/// {base_path}/
/// ├── ab/
/// │   └── ab12cd34-5678-90ab-cdef-123456789012.txt
/// ├── cd/
/// │   └── cd90ab12-3456-7890-abcd-ef1234567890
/// └── ...
/// ```
#[derive(Debug, Clone)]
pub struct BlobStore {
    /// Base directory for blob storage.
    base_path: PathBuf,
}

/// An opened blob, ready to be streamed.
#[derive(Debug)]
pub struct Blob {
    /// Open file handle positioned at the start.
    pub file: tokio::fs::File,
    /// Size of the blob on disk.
    pub len: u64,
}

fn storage_error(context: &str, e: io::Error) -> FiledropError {
    FiledropError::Storage(format!("{context}: {e}"))
}

impl BlobStore {
    /// Create a new BlobStore with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).map_err(|e| {
            storage_error(&format!("create {}", base_path.display()), e)
        })?;

        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Save content under a new stored name derived from `id` and the
    /// extension of `original_name`.
    ///
    /// # Returns
    ///
    /// The stored filename (`{id}.{ext}` or `{id}`)
    #[cfg(test)]
    pub async fn put(&self, content: &[u8], id: &str, original_name: &str) -> Result<String> {
        let stored_name = Self::stored_name_for(id, original_name);
        let mut writer = self.create(&stored_name).await?;
        writer.write(content).await?;
        writer.commit().await?;
        Ok(stored_name)
    }

    /// Start a streaming write of `stored_name`.
    ///
    /// Nothing is visible under `stored_name` until [`BlobWriter::commit`]
    /// succeeds. Dropping the writer before that removes the partial file.
    pub async fn create(&self, stored_name: &str) -> Result<BlobWriter> {
        let final_path = self.get_file_path(stored_name);
        let parent = final_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.base_path.clone());

        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| storage_error("create shard directory", e))?;

        let temp_path = parent.join(format!(".{stored_name}{PARTIAL_SUFFIX}"));
        let file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| storage_error("create blob", e))?;

        Ok(BlobWriter {
            file: Some(file),
            temp_path,
            final_path,
            written: 0,
            committed: false,
        })
    }

    /// Open a blob for streaming.
    ///
    /// A missing blob is reported as `NotFound`, never as a storage error.
    pub async fn open(&self, stored_name: &str) -> Result<Blob> {
        let file_path = self.get_file_path(stored_name);

        let file = match tokio::fs::File::open(&file_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FiledropError::NotFound(format!("Blob {stored_name}")));
            }
            Err(e) => return Err(storage_error("open blob", e)),
        };
        let len = file
            .metadata()
            .await
            .map_err(|e| storage_error("stat blob", e))?
            .len();

        Ok(Blob { file, len })
    }

    /// Delete a blob.
    ///
    /// # Returns
    ///
    /// `true` if the blob was deleted, `false` if it didn't exist
    pub async fn delete(&self, stored_name: &str) -> Result<bool> {
        let file_path = self.get_file_path(stored_name);

        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_error("delete blob", e)),
        }
    }

    /// Delete a blob without going through the async runtime.
    ///
    /// Used by drop guards, where awaiting is not possible.
    pub fn delete_blocking(&self, stored_name: &str) -> bool {
        fs::remove_file(self.get_file_path(stored_name)).is_ok()
    }

    /// Check if a blob exists.
    pub fn exists(&self, stored_name: &str) -> bool {
        self.get_file_path(stored_name).is_file()
    }

    /// Get the full file path for a stored name.
    ///
    /// The path is constructed as: {base_path}/{shard}/{stored_name}
    pub fn get_file_path(&self, stored_name: &str) -> PathBuf {
        let shard = Self::get_shard(stored_name);
        self.base_path.join(shard).join(stored_name)
    }

    /// Get the shard directory name for a stored name.
    fn get_shard(stored_name: &str) -> &str {
        stored_name.get(..2).unwrap_or(stored_name)
    }

    /// Extract a storable extension from a client filename.
    ///
    /// Only short ASCII-alphanumeric extensions are kept.
    fn extract_extension(filename: &str) -> Option<&str> {
        Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .filter(|ext| {
                !ext.is_empty()
                    && ext.len() <= MAX_EXTENSION_LENGTH
                    && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
    }

    /// Build the stored name for a record id and the client's filename.
    pub fn stored_name_for(id: &str, original_name: &str) -> String {
        match Self::extract_extension(original_name) {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        }
    }

    /// Remove partial files left by an interrupted run, then empty shard
    /// directories.
    ///
    /// Returns the number of partial files removed.
    pub fn remove_partials(&self) -> Result<usize> {
        let mut removed = 0;

        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| storage_error("read blob directory", e))?;

        for entry in entries.flatten() {
            let shard = entry.path();
            if !shard.is_dir() {
                continue;
            }
            if let Ok(files) = fs::read_dir(&shard) {
                for file in files.flatten() {
                    let is_partial = file
                        .file_name()
                        .to_str()
                        .is_some_and(|n| n.ends_with(PARTIAL_SUFFIX));
                    if is_partial && fs::remove_file(file.path()).is_ok() {
                        removed += 1;
                    }
                }
            }
            if let Ok(mut rest) = fs::read_dir(&shard) {
                if rest.next().is_none() {
                    let _ = fs::remove_dir(&shard);
                }
            }
        }

        Ok(removed)
    }
}

/// In-progress streaming write of one blob.
#[derive(Debug)]
pub struct BlobWriter {
    file: Option<tokio::fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
    committed: bool,
}

impl BlobWriter {
    /// Append a chunk.
    pub async fn write(&mut self, chunk: &[u8]) -> Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| FiledropError::Storage("write after close".to_string()))?;
        file.write_all(chunk)
            .await
            .map_err(|e| storage_error("write blob", e))?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and move the blob into place.
    ///
    /// Returns the final size in bytes.
    pub async fn commit(mut self) -> Result<u64> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .await
                .map_err(|e| storage_error("flush blob", e))?;
        }
        tokio::fs::rename(&self.temp_path, &self.final_path)
            .await
            .map_err(|e| storage_error("commit blob", e))?;
        self.committed = true;
        Ok(self.written)
    }
}

/// Removes the partial file of an uncommitted write.
///
/// A single synchronous unlink on the dropping thread.
impl Drop for BlobWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.file.take();
            let _ = fs::remove_file(&self.temp_path);
        }
    }
}
