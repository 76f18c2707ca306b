use thiserror::Error;

/// Errors that can occur during blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(String),
    /// The shard directory a blob was to be written into does not exist.
    #[error("blob directory missing: {0}")]
    MissingDirectory(String),
    /// The identifier or path cannot be mapped into the repository.
    #[error("invalid storage path: {0}")]
    InvalidPath(String),
    /// The blob exceeds the configured size limit.
    #[error("blob exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
