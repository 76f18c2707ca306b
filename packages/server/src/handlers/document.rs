use std::path::PathBuf;

use axum::Json;
use axum::body::Body;
use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use common::storage::BoxReader;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::instrument;
use uuid::Uuid;

use crate::documents::{ContentSource, DocumentDownload};
use crate::error::{AppError, ErrorBody};
use crate::extractors::json::AppJson;
use crate::models::document::{
    DeleteDocumentResponse, DocumentListQuery, DocumentListResponse, DocumentResponse,
    FetchDocumentRequest,
};
use crate::state::AppState;

/// Room for the `name` field and multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn document_upload_body_limit(max_size: u64) -> DefaultBodyLimit {
    let max_size = usize::try_from(max_size).unwrap_or(usize::MAX);
    DefaultBodyLimit::max(max_size.saturating_add(MULTIPART_OVERHEAD))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Documents",
    operation_id = "uploadDocument",
    summary = "Upload a new document",
    description = "Stores the `file` multipart field and records it under the display name given \
        in the `name` field. The upload's filename is kept as `original_filename` and its \
        extension is used for the stored file. New documents start as `pending`.",
    request_body(content_type = "multipart/form-data", description = "`file` and `name` fields"),
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 413, description = "File too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart))]
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_size = state.config.storage.max_upload_size;

    let mut upload: Option<(SpooledUpload, Option<String>)> = None;
    let mut name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error(max_size))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string);
                let spooled = spool_field(field, max_size).await?;
                upload = Some((spooled, filename));
            }
            Some("name") => {
                name = Some(field.text().await.map_err(multipart_error(max_size))?);
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (spooled, filename) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let name = name.ok_or_else(|| AppError::Validation("Missing 'name' field".into()))?;

    let reader = spooled.open().await?;
    let document = state
        .documents
        .create(ContentSource::Upload { reader, filename }, &name)
        .await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

#[utoipa::path(
    post,
    path = "/fetch",
    tag = "Documents",
    operation_id = "fetchDocument",
    summary = "Create a document from a URL",
    description = "Downloads the given HTTP(S) URL and stores it like an upload. The last path \
        segment of the URL becomes `original_filename`.",
    request_body = FetchDocumentRequest,
    responses(
        (status = 201, description = "Document created", body = DocumentResponse),
        (status = 400, description = "Invalid request or download failed (VALIDATION_ERROR, FETCH_FAILED)", body = ErrorBody),
        (status = 413, description = "Remote file too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, payload), fields(url = %payload.url))]
pub async fn fetch_document(
    State(state): State<AppState>,
    AppJson(payload): AppJson<FetchDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let document = state
        .documents
        .create(ContentSource::Remote { url: payload.url }, &payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(DocumentResponse::from(document))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Documents",
    operation_id = "listDocuments",
    summary = "List documents",
    description = "Returns documents in creation order. `limit` defaults to 100 and is capped at \
        1000. An unknown `status` value yields an empty page.",
    params(DocumentListQuery),
    responses(
        (status = 200, description = "Page of documents", body = DocumentListResponse),
    ),
)]
#[instrument(skip(state))]
pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentListQuery>,
) -> Result<Json<DocumentListResponse>, AppError> {
    let (skip, limit) = (query.skip(), query.limit());
    let page = state
        .documents
        .list(query.status.as_deref(), skip, limit)
        .await?;

    Ok(Json(DocumentListResponse {
        data: page.documents.into_iter().map(DocumentResponse::from).collect(),
        skip,
        limit,
        total: page.total,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Documents",
    operation_id = "getDocument",
    summary = "Get a document by ID",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document metadata", body = DocumentResponse),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state.documents.get(&id).await?;
    Ok(Json(DocumentResponse::from(document)))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Documents",
    operation_id = "downloadDocument",
    summary = "Download a document's content",
    description = "Streams the stored file as an attachment named after the original upload.",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 404, description = "Document or its file not found (NOT_FOUND, BLOB_MISSING)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let download = state.documents.download(&id).await?;
    let filename = download.filename();
    let DocumentDownload { size, reader, .. } = download;

    let content_type = mime_guess::from_path(&filename).first_or_octet_stream();
    let body = Body::from_stream(ReaderStream::new(reader));

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&filename),
        );
    if let Some(size) = size {
        response = response.header(header::CONTENT_LENGTH, size.to_string());
    }
    let response = response
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Documents",
    operation_id = "deleteDocument",
    summary = "Delete a document",
    description = "Removes the stored file, then the document record.",
    params(("id" = String, Path, description = "Document ID")),
    responses(
        (status = 200, description = "Document deleted", body = DeleteDocumentResponse),
        (status = 404, description = "Document not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteDocumentResponse>, AppError> {
    let document = state.documents.delete(&id).await?;

    Ok(Json(DeleteDocumentResponse {
        id: document.id,
        name: document.name,
        message: "Document deleted".into(),
    }))
}

fn multipart_error(max_size: u64) -> impl Fn(MultipartError) -> AppError {
    move |e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(max_size)
        } else {
            AppError::Validation(format!("Multipart error: {}", e.body_text()))
        }
    }
}

/// Build a safe `Content-Disposition` header value.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| (c.is_ascii_graphic() || *c == ' ') && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = match ascii_safe.trim() {
        "" => "download".to_string(),
        trimmed => trimmed.to_string(),
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}

/// A multipart file field buffered on local disk.
///
/// The service needs the display name before it writes, and multipart fields
/// may arrive in any order. The temp file is removed on drop.
struct SpooledUpload {
    path: PathBuf,
}

impl SpooledUpload {
    async fn open(&self) -> Result<BoxReader, AppError> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reopen temp file: {e}")))?;
        Ok(Box::new(file))
    }
}

impl Drop for SpooledUpload {
    fn drop(&mut self) {
        // Best effort.
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Stream a multipart field into a temp file, enforcing `max_size`.
async fn spool_field(mut field: Field<'_>, max_size: u64) -> Result<SpooledUpload, AppError> {
    let spooled = SpooledUpload {
        path: std::env::temp_dir().join(format!("docrepo-upload-{}", Uuid::new_v4())),
    };

    let mut temp_file = tokio::fs::File::create(&spooled.path)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create temp file: {e}")))?;

    let mut total_size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(multipart_error(max_size))? {
        total_size += chunk.len() as u64;
        if total_size > max_size {
            return Err(AppError::PayloadTooLarge(max_size));
        }
        temp_file
            .write_all(&chunk)
            .await
            .map_err(|e| AppError::Internal(format!("Temp file write failed: {e}")))?;
    }

    temp_file
        .flush()
        .await
        .map_err(|e| AppError::Internal(format!("Temp file flush failed: {e}")))?;

    Ok(spooled)
}
