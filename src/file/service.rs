//! File service for Filedrop.
//!
//! Ties the blob store and the catalog together: listing, upload batches,
//! downloads and deletion by id.

use std::sync::Arc;

use super::catalog::{Catalog, JsonCatalog};
use super::metadata::{FileRecord, NewFile};
use super::storage::{Blob, BlobStore};
use super::upload::UploadBatch;
use super::validation::UploadLimits;
use crate::config::Config;
use crate::{FiledropError, Result};

/// A file ready to be streamed to a client.
#[derive(Debug)]
pub struct Download {
    /// Catalog record of the file.
    pub record: FileRecord,
    /// Opened blob.
    pub blob: Blob,
}

/// File service shared by all request handlers.
#[derive(Clone)]
pub struct FileService {
    storage: BlobStore,
    catalog: Arc<dyn Catalog>,
    limits: Arc<UploadLimits>,
}

impl FileService {
    /// Create a new file service.
    pub fn new(storage: BlobStore, catalog: Arc<dyn Catalog>, limits: UploadLimits) -> Self {
        Self {
            storage,
            catalog,
            limits: Arc::new(limits),
        }
    }

    /// Create the blob directory and catalog from configuration.
    ///
    /// Both are created if absent. Partial blobs left by an interrupted run
    /// are removed.
    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = BlobStore::new(config.storage.blob_path())?;
        let swept = storage.remove_partials()?;
        if swept > 0 {
            tracing::info!(count = swept, "Removed partial uploads from a previous run");
        }

        let catalog = JsonCatalog::open(config.storage.catalog_path())?;
        tracing::info!(
            blobs = %storage.base_path().display(),
            catalog = %catalog.path().display(),
            "File storage initialized"
        );

        Ok(Self::new(
            storage,
            Arc::new(catalog),
            UploadLimits::from_config(&config.upload),
        ))
    }

    /// Blob store backing this service.
    pub fn storage(&self) -> &BlobStore {
        &self.storage
    }

    /// Upload limits.
    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Run a catalog operation on the blocking pool.
    pub(super) async fn catalog_call<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&dyn Catalog) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let catalog = Arc::clone(&self.catalog);
        tokio::task::spawn_blocking(move || op(catalog.as_ref()))
            .await
            .map_err(|e| FiledropError::Catalog(format!("catalog task failed: {e}")))?
    }

    /// All files in upload order.
    pub async fn list(&self) -> Result<Vec<FileRecord>> {
        self.catalog_call(|catalog| catalog.list()).await
    }

    /// Look up one file by id.
    pub async fn get(&self, id: &str) -> Result<FileRecord> {
        let key = id.to_string();
        self.catalog_call(move |catalog| catalog.get(&key))
            .await?
            .ok_or_else(|| FiledropError::NotFound(format!("File {id}")))
    }

    /// Start receiving an upload request.
    pub fn begin_upload(&self) -> UploadBatch {
        UploadBatch::new(self.clone())
    }

    /// Upload in-memory files as one batch.
    pub async fn upload(&self, files: Vec<NewFile>) -> Result<Vec<FileRecord>> {
        let mut batch = self.begin_upload();
        for file in &files {
            batch
                .start_file(&file.name, file.content_type.as_deref())
                .await?;
            batch.write(&file.content).await?;
            batch.finish_file().await?;
        }
        batch.commit().await
    }

    /// Open a file for download.
    ///
    /// Both an unknown id and a record whose blob has disappeared are
    /// `NotFound`.
    pub async fn open_download(&self, id: &str) -> Result<Download> {
        let record = self.get(id).await?;

        match self.storage.open(&record.stored_name).await {
            Ok(blob) => Ok(Download { record, blob }),
            Err(FiledropError::NotFound(_)) => {
                tracing::warn!(
                    id = %record.id,
                    stored_name = %record.stored_name,
                    "Catalog entry has no blob"
                );
                Err(FiledropError::NotFound(format!("File {id}")))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete a file.
    ///
    /// The catalog entry goes first; the blob is then removed best-effort.
    pub async fn delete(&self, id: &str) -> Result<FileRecord> {
        let key = id.to_string();
        let record = self
            .catalog_call(move |catalog| catalog.remove_by_id(&key))
            .await?
            .ok_or_else(|| FiledropError::NotFound(format!("File {id}")))?;

        match self.storage.delete(&record.stored_name).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                id = %record.id,
                stored_name = %record.stored_name,
                "Blob was already missing"
            ),
            Err(e) => tracing::warn!(
                id = %record.id,
                stored_name = %record.stored_name,
                error = %e,
                "Failed to remove blob"
            ),
        }

        tracing::info!(id = %record.id, name = %record.name, "File deleted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn setup_service() -> (TempDir, FileService) {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().to_string_lossy().into_owned();
        let service = FileService::from_config(&config).unwrap();
        (temp_dir, service)
    }

    fn text_file(name: &str, content: &str) -> NewFile {
        NewFile::new(name, content.to_string()).with_content_type("text/plain")
    }

    #[tokio::test]
    async fn test_from_config_creates_layout() {
        let (temp_dir, _service) = setup_service();

        assert!(temp_dir.path().join("uploads").is_dir());
        assert!(temp_dir.path().join("files.json").is_file());
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let (_temp_dir, service) = setup_service();

        let records = service
            .upload(vec![text_file("hello.txt", "Hello, World!")])
            .await
            .unwrap();
        let id = &records[0].id;

        let mut download = service.open_download(id).await.unwrap();
        let mut content = Vec::new();
        download.blob.file.read_to_end(&mut content).await.unwrap();

        assert_eq!(content, b"Hello, World!");
        assert_eq!(download.blob.len, 13);
        assert_eq!(download.record.name, "hello.txt");
    }

    #[tokio::test]
    async fn test_get_unknown_id() {
        let (_temp_dir, service) = setup_service();

        assert!(matches!(
            service.get("missing").await,
            Err(FiledropError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_missing_blob_is_not_found() {
        let (_temp_dir, service) = setup_service();
        let records = service.upload(vec![text_file("a.txt", "a")]).await.unwrap();

        std::fs::remove_file(service.storage().get_file_path(&records[0].stored_name)).unwrap();

        assert!(matches!(
            service.open_download(&records[0].id).await,
            Err(FiledropError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let (_temp_dir, service) = setup_service();
        let records = service.upload(vec![text_file("a.txt", "a")]).await.unwrap();
        let record = &records[0];

        let deleted = service.delete(&record.id).await.unwrap();
        assert_eq!(&deleted, record);
        assert!(!service.storage().exists(&record.stored_name));

        assert!(matches!(
            service.delete(&record.id).await,
            Err(FiledropError::NotFound(_))
        ));
    }

    /// Catalog that serves reads from a JSON document but refuses removals.
    struct NoRemoveCatalog(JsonCatalog);

    impl Catalog for NoRemoveCatalog {
        fn list(&self) -> Result<Vec<FileRecord>> {
            self.0.list()
        }

        fn append(&self, records: &[FileRecord]) -> Result<()> {
            self.0.append(records)
        }

        fn remove_by_id(&self, _id: &str) -> Result<Option<FileRecord>> {
            Err(FiledropError::Catalog("read-only filesystem".to_string()))
        }
    }

    #[tokio::test]
    async fn test_delete_catalog_failure_keeps_blob() {
        let temp_dir = TempDir::new().unwrap();
        let storage = BlobStore::new(temp_dir.path().join("uploads")).unwrap();
        let catalog = JsonCatalog::open(temp_dir.path().join("files.json")).unwrap();
        let service = FileService::new(
            storage,
            Arc::new(NoRemoveCatalog(catalog)),
            UploadLimits::default(),
        );
        let records = service.upload(vec![text_file("a.txt", "a")]).await.unwrap();

        let result = service.delete(&records[0].id).await;

        assert!(matches!(result, Err(FiledropError::Catalog(_))));
        assert!(service.storage().exists(&records[0].stored_name));
        assert_eq!(service.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_with_missing_blob_succeeds() {
        let (_temp_dir, service) = setup_service();
        let records = service.upload(vec![text_file("a.txt", "a")]).await.unwrap();
        std::fs::remove_file(service.storage().get_file_path(&records[0].stored_name)).unwrap();

        assert!(service.delete(&records[0].id).await.is_ok());
        assert!(service.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_after_uploads_and_deletes() {
        let (_temp_dir, service) = setup_service();

        let mut ids = Vec::new();
        for i in 0..5 {
            let records = service
                .upload(vec![text_file(&format!("{i}.txt"), "x")])
                .await
                .unwrap();
            ids.push(records[0].id.clone());
        }
        service.delete(&ids[1]).await.unwrap();
        service.delete(&ids[3]).await.unwrap();

        let listed: Vec<String> = service
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, vec![ids[0].clone(), ids[2].clone(), ids[4].clone()]);
    }

    #[tokio::test]
    async fn test_startup_sweeps_partials() {
        let temp_dir = TempDir::new().unwrap();
        let shard = temp_dir.path().join("uploads").join("ab");
        std::fs::create_dir_all(&shard).unwrap();
        std::fs::write(shard.join(".ab12.txt.part"), b"half").unwrap();

        let mut config = Config::default();
        config.storage.data_dir = temp_dir.path().to_string_lossy().into_owned();
        FileService::from_config(&config).unwrap();

        assert!(!shard.join(".ab12.txt.part").exists());
    }
}
