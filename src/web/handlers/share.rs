//! Share handlers: upload, lookup, and download.

use axum::{
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::db::UploadRepository;
use crate::share::{BlobMeta, ShareService};
use crate::web::dto::{LookupResponse, ShareInfoResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::DropError;

/// Generate a safe Content-Disposition header value for downloads.
///
/// Always carries both forms: a sanitized `filename` fallback for old
/// clients and the RFC 5987 `filename*` variant, which survives
/// non-ASCII names. Control characters and quoting hazards are stripped
/// from the fallback to prevent header injection.
fn content_disposition_header(filename: &str) -> String {
    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control() && c.is_ascii())
        .map(|c| match c {
            '"' => '_',
            '\\' => '_',
            _ => c,
        })
        .collect();

    let encoded = urlencoding::encode(filename);

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    )
}

/// Pick the stored MIME type: the declared type wins; otherwise guess
/// from the filename, falling back to the generic binary type.
fn resolve_mime(declared: Option<String>, filename: &str) -> String {
    declared.unwrap_or_else(|| {
        mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string()
    })
}

/// POST /api/upload - Receive a file and create a share code.
///
/// Request body: multipart/form-data with a "file" field. The blob is
/// staged to storage first, then registered (receive-then-register); a
/// registration failure cleans up the staged blob.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "share",
    responses(
        (status = 200, description = "Upload registered", body = ShareInfoResponse),
        (status = 400, description = "No file provided"),
        (status = 413, description = "File too large")
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ShareInfoResponse>, ApiError> {
    let mut filename: Option<String> = None;
    let mut declared_mime: Option<String> = None;
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            filename = field.file_name().map(|s| s.to_string());
            declared_mime = field
                .content_type()
                .map(|s| s.to_string())
                .filter(|s| !s.is_empty());
            content = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| {
                        tracing::error!("Failed to read file content: {}", e);
                        ApiError::bad_request("Failed to read file")
                    })?
                    .to_vec(),
            );
        }
    }

    let filename = filename.ok_or(DropError::NoFile).map_err(ApiError::from)?;
    let content = content.ok_or(DropError::NoFile).map_err(ApiError::from)?;

    if content.len() as u64 > state.max_upload_size {
        let max_mb = state.max_upload_size / 1024 / 1024;
        return Err(ApiError::payload_too_large(format!(
            "File too large (max {}MB)",
            max_mb
        )));
    }

    let mime_type = resolve_mime(declared_mime, &filename);

    // Stage the blob before registering it
    let stored_name = state.storage.save(&content, &filename).map_err(|e| {
        tracing::error!("Failed to save file: {}", e);
        ApiError::internal("Failed to save file")
    })?;

    let meta = BlobMeta {
        original_name: filename,
        stored_name: stored_name.clone(),
        size_bytes: content.len() as i64,
        mime_type,
    };

    let info = match state.shares.create_share(meta).await {
        Ok(info) => info,
        Err(e) => {
            // Registration failed; reclaim the staged blob
            let _ = state.storage.delete(&stored_name);
            return Err(e.into());
        }
    };

    Ok(Json(info.into()))
}

/// GET /api/lookup/:code - Get share metadata without touching the blob.
#[utoipa::path(
    get,
    path = "/api/lookup/{code}",
    tag = "share",
    params(
        ("code" = String, Path, description = "Share code")
    ),
    responses(
        (status = 200, description = "Share metadata", body = LookupResponse),
        (status = 404, description = "Unknown code"),
        (status = 410, description = "Link expired")
    )
)]
pub async fn lookup_share(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<LookupResponse>, ApiError> {
    let now = ShareService::now();
    let record = state.shares.resolve(&code, now).await?;

    let links = state.shares.links(&record.code);
    Ok(Json(LookupResponse::new(&record, links)))
}

/// GET /api/download/:code - Stream the file behind a share code.
///
/// The expiry check uses a single `now` read; a link that expires while
/// the bytes are in flight is not interrupted. The download counter is
/// incremented once the blob is open and before streaming begins, so it
/// counts initiated downloads, completed or not.
#[utoipa::path(
    get,
    path = "/api/download/{code}",
    tag = "share",
    params(
        ("code" = String, Path, description = "Share code")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Unknown code"),
        (status = 410, description = "Link expired"),
        (status = 500, description = "Backing blob missing")
    )
)]
pub async fn download_share(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let now = ShareService::now();
    let record = state.shares.resolve(&code, now).await?;

    // Opening the blob can race the sweeper; a missing blob is a server
    // fault (BlobMissing -> 500), never an empty 200
    let file = state.storage.open(&record.stored_name).await?;

    let repo = UploadRepository::new(state.db.pool());
    repo.increment_downloads(&record.code).await?;

    // Dropping the stream on peer disconnect closes the file handle
    let body = Body::from_stream(ReaderStream::new(file));

    let response = Response::builder()
        .header(header::CONTENT_TYPE, record.mime_type.as_str())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&record.original_name),
        )
        .header(header::CONTENT_LENGTH, record.size_bytes)
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })?;

    Ok(response)
}
