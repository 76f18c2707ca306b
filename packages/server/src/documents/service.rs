use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use common::DocumentStatus;
use common::storage::{BlobStore, BoxReader, PathAllocator, StorageError};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::fetch::RemoteFetcher;
use super::store::MetadataStore;
use crate::entity::document;

/// Maximum length of a display name, in characters.
pub const MAX_NAME_LEN: usize = 256;

/// Failure kinds of document operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// No row for the given id.
    #[error("document {0} not found")]
    NotFound(String),
    /// The row exists but its blob is gone from disk.
    #[error("blob for document {0} is missing from storage")]
    BlobMissing(String),
    #[error("{0}")]
    Validation(String),
    /// The remote source could not be downloaded.
    #[error("failed to fetch remote document: {0}")]
    Fetch(String),
    #[error("document exceeds maximum size of {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("storage fault: {0}")]
    Storage(StorageError),
    #[error("metadata store fault: {0}")]
    Store(#[from] DbErr),
}

impl From<StorageError> for DocumentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SizeLimitExceeded { limit, .. } => Self::TooLarge { limit },
            other => Self::Storage(other),
        }
    }
}

/// Where the bytes of a new document come from.
pub enum ContentSource {
    /// Bytes supplied by the client.
    Upload {
        reader: BoxReader,
        /// Client-side filename; also the extension hint.
        filename: Option<String>,
    },
    /// A document to be downloaded from an HTTP(S) URL.
    Remote { url: String },
}

impl ContentSource {
    pub fn bytes(data: impl Into<Vec<u8>>, filename: Option<String>) -> Self {
        Self::Upload {
            reader: Box::new(std::io::Cursor::new(data.into())),
            filename,
        }
    }
}

/// One page of a listing.
#[derive(Debug)]
pub struct DocumentPage {
    pub documents: Vec<document::Model>,
    /// Number of rows matching the filter across all pages.
    pub total: u64,
}

/// An open blob paired with the row describing it.
pub struct DocumentDownload {
    pub document: document::Model,
    /// Blob length, if it could be determined.
    pub size: Option<u64>,
    pub reader: BoxReader,
}

impl DocumentDownload {
    /// Filename to present to the client: the uploaded name if known,
    /// otherwise the stored file name.
    pub fn filename(&self) -> String {
        self.document
            .original_filename
            .clone()
            .filter(|name| !name.trim().is_empty())
            .or_else(|| {
                Path::new(&self.document.local_path)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| self.document.id.clone())
    }
}

/// Keeps document rows and blobs in step.
///
/// Create writes the blob first and inserts the row last; delete removes the
/// blob first and the row last. A failure in between therefore leaves either
/// nothing or a dangling row, never an untracked blob. The exception is a
/// crash between blob write and row insert, which can orphan a blob.
pub struct DocumentService {
    allocator: PathAllocator,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    fetcher: RemoteFetcher,
}

impl DocumentService {
    pub fn new(
        allocator: PathAllocator,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
        fetcher: RemoteFetcher,
    ) -> Self {
        Self {
            allocator,
            blobs,
            metadata,
            fetcher,
        }
    }

    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    /// Store a new document and record it with status `pending`.
    #[instrument(skip(self, source), fields(document_id))]
    pub async fn create(
        &self,
        source: ContentSource,
        name: &str,
    ) -> Result<document::Model, DocumentError> {
        let name = validate_name(name)?;

        let (mut reader, original_filename) = match source {
            ContentSource::Upload { reader, filename } => (reader, filename),
            ContentSource::Remote { url } => {
                let fetched = self.fetcher.fetch(&url).await?;
                (fetched.reader, fetched.filename)
            }
        };

        let id = Uuid::new_v4().to_string();
        tracing::Span::current().record("document_id", id.as_str());

        let mut pending = self
            .write_blob(&id, original_filename.as_deref(), &mut reader)
            .await?;

        let now = Utc::now();
        let model = document::Model {
            id,
            name,
            original_filename,
            local_path: pending.path().to_string_lossy().into_owned(),
            status: DocumentStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        match self.metadata.insert(model).await {
            Ok(model) => {
                pending.keep();
                info!(path = %model.local_path, "Document created");
                Ok(model)
            }
            Err(e) => {
                error!(error = %e, "Failed to record document, removing blob");
                pending.discard().await;
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<document::Model, DocumentError> {
        self.metadata
            .get(id)
            .await?
            .ok_or_else(|| DocumentError::NotFound(id.to_string()))
    }

    /// List documents. A blank status filter is no filter; an unrecognised
    /// one matches nothing.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        status: Option<&str>,
        skip: u64,
        limit: u64,
    ) -> Result<DocumentPage, DocumentError> {
        let status = status.map(str::trim).filter(|s| !s.is_empty());
        let status = match status.map(str::parse::<DocumentStatus>) {
            None => None,
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                debug!(error = %e, "Unknown status filter");
                return Ok(DocumentPage {
                    documents: Vec::new(),
                    total: 0,
                });
            }
        };

        let total = self.metadata.count(status).await?;
        let documents = if limit == 0 {
            Vec::new()
        } else {
            self.metadata.list(status, skip, limit).await?
        };

        Ok(DocumentPage { documents, total })
    }

    /// Open a document's blob for streaming.
    #[instrument(skip(self))]
    pub async fn download(&self, id: &str) -> Result<DocumentDownload, DocumentError> {
        let document = self.get(id).await?;
        let path = Path::new(&document.local_path);

        let reader = match self.blobs.open(path).await {
            Ok(reader) => reader,
            Err(StorageError::NotFound(_)) => {
                warn!(path = %document.local_path, "Document blob missing");
                return Err(DocumentError::BlobMissing(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        // `size` reports 0 when the metadata read fails, which must not turn
        // into an empty Content-Length for a blob that was just opened.
        let size = Some(self.blobs.size(path).await).filter(|&n| n > 0);

        Ok(DocumentDownload {
            document,
            size,
            reader,
        })
    }

    /// Remove a document's blob, then its row.
    ///
    /// A blob that is already gone is not an error. If the row cannot be
    /// removed afterwards the blob is not restored.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<document::Model, DocumentError> {
        let document = self.get(id).await?;

        if !self.blobs.delete(Path::new(&document.local_path)).await? {
            warn!(path = %document.local_path, "Blob already absent during delete");
        }

        if !self.metadata.delete(id).await? {
            // A concurrent delete removed the row first.
            return Err(DocumentError::NotFound(id.to_string()));
        }

        info!("Document deleted");
        Ok(document)
    }

    /// Allocate a path and stream the content into it.
    ///
    /// If the shard directory is pruned by a concurrent delete between
    /// allocation and write, allocation is repeated once.
    async fn write_blob(
        &self,
        id: &str,
        hint: Option<&str>,
        reader: &mut BoxReader,
    ) -> Result<PendingBlob, DocumentError> {
        let mut retried = false;
        loop {
            let path = self.allocator.allocate(id, hint).await?;
            let mut pending = PendingBlob::new(self.blobs.clone(), path);

            match self.blobs.write_stream(pending.path(), reader).await {
                Ok(size) => {
                    debug!(path = %pending.path().display(), size, "Blob written");
                    return Ok(pending);
                }
                Err(StorageError::MissingDirectory(dir)) if !retried => {
                    pending.keep();
                    debug!(dir = %dir, "Shard directory vanished, allocating again");
                    retried = true;
                }
                Err(e) => {
                    warn!(path = %pending.path().display(), error = %e, "Blob write failed");
                    pending.discard().await;
                    return Err(e.into());
                }
            }
        }
    }
}

/// A written blob whose row has not been committed yet.
///
/// Dropping it without [`PendingBlob::keep`] (for example when the request is
/// cancelled mid-create) schedules the blob for deletion.
struct PendingBlob {
    blobs: Arc<dyn BlobStore>,
    path: PathBuf,
    armed: bool,
}

impl PendingBlob {
    fn new(blobs: Arc<dyn BlobStore>, path: PathBuf) -> Self {
        Self {
            blobs,
            path,
            armed: true,
        }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn keep(&mut self) {
        self.armed = false;
    }

    /// Compensating delete. Failures are logged, the original fault wins.
    async fn discard(&mut self) {
        self.armed = false;
        if let Err(e) = self.blobs.delete(&self.path).await {
            error!(path = %self.path.display(), error = %e, "Failed to remove orphaned blob");
        }
    }
}

impl Drop for PendingBlob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let blobs = self.blobs.clone();
        let path = std::mem::take(&mut self.path);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = blobs.delete(&path).await {
                        error!(
                            path = %path.display(),
                            error = %e,
                            "Failed to remove abandoned blob"
                        );
                    }
                });
            }
            Err(_) => {
                error!(path = %path.display(), "No runtime to remove abandoned blob");
            }
        }
    }
}

/// Trim and check a display name.
fn validate_name(name: &str) -> Result<String, DocumentError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(DocumentError::Validation(format!(
            "Name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
