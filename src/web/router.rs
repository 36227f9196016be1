//! Router configuration for the Filedrop API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{
    delete_file, download_file, get_file, index, list_files, upload_files, AppState,
};
use super::middleware::{create_cors_layer, security_headers};
use super::openapi::create_openapi_router;
use crate::file::{UploadLimits, MULTIPART_OVERHEAD};

/// Largest request body accepted on the upload route.
///
/// Enough for a full batch of maximum-size files plus multipart framing.
pub fn upload_body_limit(limits: &UploadLimits) -> usize {
    let bytes = limits
        .max_file_size
        .saturating_mul(limits.max_files as u64)
        .saturating_add(MULTIPART_OVERHEAD);
    usize::try_from(bytes).unwrap_or(usize::MAX)
}

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = upload_body_limit(app_state.files.limits());

    Router::new()
        .route("/", get(index))
        .route("/files", get(list_files))
        .route("/files/:id", get(get_file))
        .route(
            "/upload",
            post(upload_files).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/download/:id", get(download_file))
        .route("/delete/:id", delete(delete_file))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Assemble the complete application: API, health check, OpenAPI document
/// and response compression.
pub fn create_app(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    create_router(app_state, cors_origins)
        .merge(create_health_router())
        .merge(create_openapi_router())
        .layer(CompressionLayer::new())
}
