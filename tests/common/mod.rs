//! Test helpers for the HTTP API tests.
//!
//! Provides a [`TestApp`] wrapping an axum-test server over a temporary data
//! directory, plus helpers for building multipart uploads.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use tempfile::TempDir;

use filedrop::config::Config;
use filedrop::file::{BlobStore, Catalog, FileService, UploadLimits};
use filedrop::web::{create_app, AppState};

/// Server under test plus the directory holding its data.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub config: Config,
    _temp_dir: TempDir,
}

impl TestApp {
    /// Start an app with the default configuration.
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Start an app after letting the caller adjust the configuration.
    pub fn with_config(modify: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self::in_dir(temp_dir, modify)
    }

    /// Start an app over an existing data directory.
    pub fn in_dir(temp_dir: TempDir, modify: impl FnOnce(&mut Config)) -> Self {
        let mut config = test_config(temp_dir.path());
        modify(&mut config);

        let state = Arc::new(AppState::from_config(&config).expect("Failed to create app state"));
        let router = create_app(state.clone(), &config.server.cors_origins);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Start an app whose file service uses the given catalog.
    pub fn with_catalog(catalog: Arc<dyn Catalog>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(temp_dir.path());

        let storage =
            BlobStore::new(config.storage.blob_path()).expect("Failed to create blob store");
        let limits = UploadLimits::from_config(&config.upload);
        let files = FileService::new(storage, catalog, limits);
        let state = Arc::new(AppState::new(files));
        let router = create_app(state.clone(), &config.server.cors_origins);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            state,
            config,
            _temp_dir: temp_dir,
        }
    }

    /// Directory holding the blobs.
    pub fn blob_dir(&self) -> PathBuf {
        self.config.storage.blob_path()
    }

    /// Path of the catalog document.
    pub fn catalog_path(&self) -> PathBuf {
        self.config.storage.catalog_path()
    }

    /// Number of blob files on disk, partial files included.
    pub fn blob_count(&self) -> usize {
        count_files(&self.blob_dir())
    }
}

/// Configuration rooted at `data_dir`.
pub fn test_config(data_dir: &Path) -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.storage.data_dir = data_dir.to_string_lossy().into_owned();
    config
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

/// A file part for the `files` field.
pub fn file_part(name: &str, mime_type: &str, content: &[u8]) -> Part {
    Part::bytes(content.to_vec())
        .file_name(name.to_string())
        .mime_type(mime_type.to_string())
}

/// A multipart form holding the given files.
pub fn upload_form(files: &[(&str, &str, &[u8])]) -> MultipartForm {
    files
        .iter()
        .fold(MultipartForm::new(), |form, (name, mime, content)| {
            form.add_part("files", file_part(name, mime, content))
        })
}

/// A form with `count` small text files named `<prefix>-<n>.txt`.
pub fn text_files_form(prefix: &str, count: usize) -> MultipartForm {
    (0..count).fold(MultipartForm::new(), |form, i| {
        let name = format!("{prefix}-{i}.txt");
        let content = format!("content of {name}");
        form.add_part("files", file_part(&name, "text/plain", content.as_bytes()))
    })
}
