//! API handlers for Filedrop.

pub mod file;
pub mod landing;

pub use file::*;
pub use landing::*;

use crate::config::Config;
use crate::file::FileService;
use crate::Result;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// File service (blob store + catalog).
    pub files: FileService,
}

impl AppState {
    /// Create a new application state.
    pub fn new(files: FileService) -> Self {
        Self { files }
    }

    /// Build the state from configuration, creating storage as needed.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(FileService::from_config(config)?))
    }
}
