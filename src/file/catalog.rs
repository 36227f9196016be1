//! File catalog for Filedrop.
//!
//! The catalog is the authoritative list of stored files. [`Catalog`] keeps
//! the interface narrow so the backing format can change without touching
//! the upload, download and delete paths. [`JsonCatalog`] stores the whole
//! list as one JSON document and rewrites it on every mutation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::metadata::FileRecord;
use crate::{FiledropError, Result};

/// Catalog operations.
///
/// Implementations must serialize mutations: two concurrent `append` or
/// `remove_by_id` calls never lose each other's changes.
pub trait Catalog: Send + Sync {
    /// All records in insertion order.
    fn list(&self) -> Result<Vec<FileRecord>>;

    /// Append a batch of records in one write. Either all are stored or none.
    fn append(&self, records: &[FileRecord]) -> Result<()>;

    /// Remove the record with the given id.
    ///
    /// Returns the removed record, or `None` if no record had that id.
    fn remove_by_id(&self, id: &str) -> Result<Option<FileRecord>>;

    /// Find a record by id.
    fn get(&self, id: &str) -> Result<Option<FileRecord>> {
        Ok(self.list()?.into_iter().find(|r| r.id == id))
    }
}

/// Result of reading the catalog document.
struct Loaded {
    records: Vec<FileRecord>,
    corrupt: bool,
}

/// Catalog stored as a single pretty-printed JSON array.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    lock: Mutex<()>,
}

fn catalog_error(context: &str, e: io::Error) -> FiledropError {
    FiledropError::Catalog(format!("{context}: {e}"))
}

impl JsonCatalog {
    /// Open the catalog at `path`, creating an empty document (and its
    /// parent directory) if it doesn't exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| catalog_error("create catalog directory", e))?;
            }
        }

        let catalog = Self {
            path,
            lock: Mutex::new(()),
        };
        if !catalog.path.exists() {
            catalog.write_records(&[])?;
            tracing::info!(path = %catalog.path.display(), "Created empty catalog");
        }

        Ok(catalog)
    }

    /// Path of the catalog document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path an unreadable document is moved to before being replaced.
    pub fn corrupt_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        PathBuf::from(name)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // Guarded data is `()`, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the whole document.
    ///
    /// A missing document is an empty catalog. An unparseable one is logged
    /// and treated as empty.
    fn load(&self) -> Result<Loaded> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Loaded {
                    records: Vec::new(),
                    corrupt: false,
                });
            }
            Err(e) => return Err(catalog_error("read catalog", e)),
        };

        if content.trim().is_empty() {
            return Ok(Loaded {
                records: Vec::new(),
                corrupt: false,
            });
        }

        match serde_json::from_str(&content) {
            Ok(records) => Ok(Loaded {
                records,
                corrupt: false,
            }),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Catalog is unreadable, serving it as empty"
                );
                Ok(Loaded {
                    records: Vec::new(),
                    corrupt: true,
                })
            }
        }
    }

    /// Replace the whole document.
    fn write_records(&self, records: &[FileRecord]) -> Result<()> {
        let json = serde_json::to_string_pretty(records)?;

        let mut temp = self.path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        fs::write(&temp, json).map_err(|e| catalog_error("write catalog", e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            catalog_error("replace catalog", e)
        })
    }

    /// Load for a mutation, moving an unreadable document aside first.
    fn load_for_update(&self) -> Result<Vec<FileRecord>> {
        let loaded = self.load()?;
        if loaded.corrupt {
            let aside = self.corrupt_path();
            fs::rename(&self.path, &aside)
                .map_err(|e| catalog_error("preserve corrupt catalog", e))?;
            tracing::warn!(
                path = %aside.display(),
                "Moved unreadable catalog aside before rewriting"
            );
        }
        Ok(loaded.records)
    }
}

impl Catalog for JsonCatalog {
    fn list(&self) -> Result<Vec<FileRecord>> {
        let _guard = self.guard();
        Ok(self.load()?.records)
    }

    fn append(&self, records: &[FileRecord]) -> Result<()> {
        let _guard = self.guard();
        let mut all = self.load_for_update()?;
        all.extend_from_slice(records);
        self.write_records(&all)?;
        tracing::debug!(added = records.len(), total = all.len(), "Catalog updated");
        Ok(())
    }

    fn remove_by_id(&self, id: &str) -> Result<Option<FileRecord>> {
        let _guard = self.guard();
        let mut all = self.load_for_update()?;
        let Some(pos) = all.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = all.remove(pos);
        self.write_records(&all)?;
        tracing::debug!(id = %id, total = all.len(), "Catalog entry removed");
        Ok(Some(removed))
    }
}
