//! File handlers for the Filedrop API.

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::file::{Download, FileRecord, UploadBatch, UploadLimits, DEFAULT_MIME_TYPE};
use crate::web::dto::{MessageResponse, UploadResponse};
use crate::web::error::{ApiError, ErrorBody};
use crate::web::handlers::AppState;
use crate::FiledropError;

/// Multipart field carrying the uploaded files.
pub const UPLOAD_FIELD: &str = "files";

/// Generate the Content-Disposition header value for a download.
///
/// The name is percent-encoded, which also strips quotes and control
/// characters that could break out of the header.
fn content_disposition_header(filename: &str) -> String {
    let encoded = urlencoding::encode(filename);
    format!("attachment; filename=\"{encoded}\"; filename*=UTF-8''{encoded}")
}

fn multipart_error(e: MultipartError, limits: &UploadLimits) -> FiledropError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FiledropError::TooLarge {
            name: "upload".to_string(),
            limit: limits.max_file_size,
        }
    } else {
        tracing::debug!("Failed to read multipart data: {}", e);
        FiledropError::InvalidRequest(format!("Invalid multipart data: {}", e.body_text()))
    }
}

/// Feed every file part of the request into the batch.
async fn receive_files(
    batch: &mut UploadBatch,
    multipart: &mut Multipart,
    limits: &UploadLimits,
) -> Result<(), FiledropError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        // Text fields are ignored
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let field_name = field.name().unwrap_or_default().to_string();
        if field_name != UPLOAD_FIELD {
            return Err(FiledropError::InvalidRequest(format!(
                "Unexpected file field '{field_name}'"
            )));
        }

        // Browsers send an empty part for an empty file input
        if file_name.is_empty() {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        batch.start_file(&file_name, content_type.as_deref()).await?;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limits))?
        {
            batch.write(&chunk).await?;
        }

        batch.finish_file().await?;
    }

    Ok(())
}

/// GET /files - List all files.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "All files in upload order", body = Vec<FileRecord>),
        (status = 500, description = "Catalog read error", body = ErrorBody)
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FileRecord>>, ApiError> {
    let files = state.files.list().await?;
    Ok(Json(files))
}

/// GET /files/:id - Get file metadata.
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File metadata", body = FileRecord),
        (status = 404, description = "File not found", body = ErrorBody)
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FileRecord>, ApiError> {
    let file = state.files.get(&id).await?;
    Ok(Json(file))
}

/// POST /upload - Upload one or more files.
///
/// Request body: multipart/form-data with one or more `files` parts.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(
        content = Vec<u8>,
        content_type = "multipart/form-data",
        description = "One or more `files` parts"
    ),
    responses(
        (status = 200, description = "Files stored", body = UploadResponse),
        (status = 400, description = "No files, too many files, file too large or unsupported type", body = ErrorBody),
        (status = 500, description = "Storage or catalog error", body = ErrorBody)
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected upload body: {}", e);
        ApiError::invalid_request("Expected a multipart/form-data body")
    })?;

    // Dropping the batch on any error below removes the blobs it wrote.
    let mut batch = state.files.begin_upload();
    receive_files(&mut batch, &mut multipart, state.files.limits()).await?;
    let records = batch.commit().await?;

    Ok(Json(UploadResponse::new(records)))
}

/// GET /download/:id - Download a file.
#[utoipa::path(
    get,
    path = "/download/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Failed to open file", body = ErrorBody)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let Download { record, blob } = state.files.open_download(&id).await?;

    let content_type = HeaderValue::from_str(record.content_type())
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_MIME_TYPE));

    let response = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.name),
        )
        .header(header::CONTENT_LENGTH, blob.len)
        .body(Body::from_stream(ReaderStream::new(blob.file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    tracing::debug!(id = %record.id, size = blob.len, "Streaming download");

    Ok(response)
}

/// DELETE /delete/:id - Delete a file.
#[utoipa::path(
    delete,
    path = "/delete/{id}",
    tag = "files",
    params(
        ("id" = String, Path, description = "File ID")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorBody),
        (status = 500, description = "Catalog write error", body = ErrorBody)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.files.delete(&id).await?;
    Ok(Json(MessageResponse::new("File deleted successfully")))
}
