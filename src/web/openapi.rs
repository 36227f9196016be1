//! OpenAPI document for the Filedrop API.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::file::FileRecord;
use crate::web::dto::{MessageResponse, UploadResponse};
use crate::web::error::{ErrorBody, ErrorCode, ErrorDetail};

/// OpenAPI document covering the file endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filedrop API",
        description = "Upload, list, download and delete files.",
    ),
    paths(
        crate::web::handlers::file::list_files,
        crate::web::handlers::file::get_file,
        crate::web::handlers::file::upload_files,
        crate::web::handlers::file::download_file,
        crate::web::handlers::file::delete_file,
    ),
    components(schemas(
        FileRecord,
        UploadResponse,
        MessageResponse,
        ErrorBody,
        ErrorDetail,
        ErrorCode,
    )),
    tags(
        (name = "files", description = "File storage endpoints")
    )
)]
pub struct ApiDoc;

/// Path the OpenAPI document is served at.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create a router serving the OpenAPI document as JSON.
pub fn create_openapi_router() -> Router {
    Router::new().route(OPENAPI_PATH, get(openapi_json))
}
