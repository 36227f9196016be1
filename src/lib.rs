//! Filedrop - a small file hosting service.
//!
//! Uploaded files are kept as blobs on disk and described by a JSON catalog.
//! Everything is reachable over a plain HTTP API.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{FiledropError, Result};
pub use file::{Catalog, FileRecord, FileService, JsonCatalog, NewFile};
pub use web::WebServer;
