use chrono::{DateTime, Utc};
use common::DocumentStatus;
use serde::{Deserialize, Serialize};

use crate::entity::document;

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 1000;

/// Response DTO for a single document.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentResponse {
    /// Document ID (UUIDv4).
    #[schema(example = "3f2b8c1e-9d4a-4b7e-8f21-0c5d6e7f8a90")]
    pub id: String,
    /// Display name.
    #[schema(example = "Quarterly report")]
    pub name: String,
    /// Filename supplied at upload, if any.
    #[schema(example = "report.pdf")]
    pub original_filename: Option<String>,
    /// Location of the stored file.
    #[schema(example = "repository/3f/3f2b8c1e-9d4a-4b7e-8f21-0c5d6e7f8a90.pdf")]
    pub local_path: String,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<document::Model> for DocumentResponse {
    fn from(model: document::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            original_filename: model.original_filename,
            local_path: model.local_path,
            status: model.status,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Response DTO for listing documents.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DocumentListResponse {
    pub data: Vec<DocumentResponse>,
    pub skip: u64,
    pub limit: u64,
    /// Number of documents matching the filter across all pages.
    pub total: u64,
}

/// Query parameters for document listing.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct DocumentListQuery {
    /// Number of documents to skip.
    #[param(example = 0)]
    pub skip: Option<u64>,
    /// Maximum number of documents to return (default 100, at most 1000).
    #[param(example = 100)]
    pub limit: Option<u64>,
    /// Filter by status. Unknown values match nothing.
    #[param(example = "pending")]
    pub status: Option<String>,
}

impl DocumentListQuery {
    pub fn skip(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

/// Request body for creating a document from a remote URL.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct FetchDocumentRequest {
    /// HTTP(S) URL to download.
    #[schema(example = "https://example.com/files/report.pdf")]
    pub url: String,
    /// Display name for the new document.
    #[schema(example = "Quarterly report")]
    pub name: String,
}

/// Response DTO for a deleted document.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DeleteDocumentResponse {
    pub id: String,
    pub name: String,
    #[schema(example = "Document deleted")]
    pub message: String,
}
