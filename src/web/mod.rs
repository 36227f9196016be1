//! Web API module for Filedrop.
//!
//! This module exposes the file service over HTTP: a JSON API for listing,
//! uploading, downloading and deleting files, plus a small landing page.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{create_app, create_router};
pub use server::WebServer;
