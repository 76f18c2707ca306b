use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Path-addressed blob storage.
///
/// Implementations never create directories on write; the caller allocates
/// the location first (see [`super::PathAllocator`]).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write bytes to a new blob at `path`.
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let mut reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.write_stream(path, &mut reader).await.map(|_| ())
    }

    /// Write a blob from an async reader and return the number of bytes written.
    ///
    /// A failed write leaves nothing behind at `path`. `MissingDirectory` is
    /// reported before anything is consumed from `reader`.
    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut BoxReader,
    ) -> Result<u64, StorageError>;

    /// Retrieve all bytes of a blob.
    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(path).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Open a blob as a streaming reader. `NotFound` if absent.
    async fn open(&self, path: &Path) -> Result<BoxReader, StorageError>;

    /// Check whether a blob exists.
    async fn exists(&self, path: &Path) -> Result<bool, StorageError>;

    /// Delete a blob and prune its shard directory if it became empty.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, path: &Path) -> Result<bool, StorageError>;

    /// Size of a blob in bytes, or 0 if it cannot be read.
    async fn size(&self, path: &Path) -> u64;
}
