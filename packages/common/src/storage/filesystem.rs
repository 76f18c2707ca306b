use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use super::error::StorageError;
use super::traits::{BlobStore, BoxReader};

/// Filesystem-backed blob store rooted at the document repository.
///
/// Blobs live in shard directories below `base_path`; when the last blob of
/// a shard is deleted the shard directory is removed as well. The base
/// directory itself is never removed.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store, creating the base directory.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Remove the blob's parent directory if it is empty. One level only.
    async fn prune_parent(&self, path: &Path) {
        let Some(parent) = path.parent() else {
            return;
        };
        if parent == self.base_path || !parent.starts_with(&self.base_path) {
            return;
        }

        // `remove_dir` refuses non-empty directories, so a concurrent write
        // into the same shard is never lost.
        match fs::remove_dir(parent).await {
            Ok(()) => debug!(dir = %parent.display(), "Removed empty shard directory"),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => {}
            Err(e) => warn!(
                dir = %parent.display(),
                error = %e,
                "Failed to remove empty shard directory"
            ),
        }
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn write(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let mut file = create_new(path).await?;
        let result = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = result {
            drop(file);
            let _ = fs::remove_file(path).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn write_stream(
        &self,
        path: &Path,
        reader: &mut BoxReader,
    ) -> Result<u64, StorageError> {
        let mut file = create_new(path).await?;
        let mut total_bytes: u64 = 0;
        let mut buf = vec![0u8; 64 * 1024]; // 64KB read buffer

        let result: Result<u64, StorageError> = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }

                total_bytes += n as u64;
                if total_bytes > self.max_size {
                    return Err(StorageError::SizeLimitExceeded {
                        actual: total_bytes,
                        limit: self.max_size,
                    });
                }

                file.write_all(&buf[..n]).await?;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok(total_bytes)
        }
        .await;

        if result.is_err() {
            drop(file);
            let _ = fs::remove_file(path).await;
        }
        result
    }

    async fn open(&self, path: &Path) -> Result<BoxReader, StorageError> {
        match fs::File::open(path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool, StorageError> {
        Ok(fs::try_exists(path).await?)
    }

    async fn delete(&self, path: &Path) -> Result<bool, StorageError> {
        match fs::remove_file(path).await {
            Ok(()) => {
                self.prune_parent(path).await;
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, path: &Path) -> u64 {
        fs::metadata(path).await.map(|meta| meta.len()).unwrap_or(0)
    }
}

/// Create a file that must not already exist.
async fn create_new(path: &Path) -> Result<fs::File, StorageError> {
    fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::MissingDirectory(
                path.parent()
                    .unwrap_or(path)
                    .display()
                    .to_string(),
            ),
            _ => e.into(),
        })
}
