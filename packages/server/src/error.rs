use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde::Serialize;

use crate::documents::DocumentError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `BLOB_MISSING`, `FETCH_FAILED`, `PAYLOAD_TOO_LARGE`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Name must be 1-256 characters")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    /// The document row exists but its stored file does not.
    BlobMissing(String),
    FetchFailed(String),
    PayloadTooLarge(u64),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::BlobMissing(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "BLOB_MISSING",
                    message: msg,
                },
            ),
            AppError::FetchFailed(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "FETCH_FAILED",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: format!("Document exceeds maximum size of {limit} bytes"),
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(id) => AppError::NotFound(format!("Document '{id}' not found")),
            DocumentError::BlobMissing(id) => {
                AppError::BlobMissing(format!("File for document '{id}' is missing from storage"))
            }
            DocumentError::Validation(msg) => AppError::Validation(msg),
            DocumentError::Fetch(msg) => {
                tracing::warn!("Remote fetch failed: {msg}");
                AppError::FetchFailed(msg)
            }
            DocumentError::TooLarge { limit } => AppError::PayloadTooLarge(limit),
            other @ (DocumentError::Storage(_) | DocumentError::Store(_)) => {
                AppError::Internal(other.to_string())
            }
        }
    }
}
