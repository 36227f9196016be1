//! Middleware for the Filedrop API.

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::security_headers;
