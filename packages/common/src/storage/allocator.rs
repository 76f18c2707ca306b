use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::StorageError;

/// Extension used when the filename hint carries none.
pub const DEFAULT_EXTENSION: &str = ".txt";

const MAX_EXTENSION_LEN: usize = 16;

/// Derive the on-disk extension (with leading dot) from a filename or URL
/// path segment.
///
/// Extensions that are not short ASCII alphanumerics are treated as absent.
pub fn extension_hint(hint: Option<&str>) -> String {
    hint.and_then(|h| Path::new(h).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{ext}"))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

/// Maps document identifiers to storage locations.
///
/// Layout: `{base_path}/{first 2 chars of id}/{id}{ext}`. The two-character
/// shard keeps the number of entries per directory bounded.
#[derive(Debug, Clone)]
pub struct PathAllocator {
    base_path: PathBuf,
}

impl PathAllocator {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Shard directory for an identifier.
    pub fn shard_dir(&self, id: &str) -> Result<PathBuf, StorageError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(StorageError::InvalidPath(format!("invalid identifier '{id}'")));
        }
        let prefix = id
            .get(..2)
            .ok_or_else(|| StorageError::InvalidPath(format!("identifier too short: '{id}'")))?;
        Ok(self.base_path.join(prefix))
    }

    /// Compute the blob path for an identifier without touching the filesystem.
    pub fn path_for(&self, id: &str, hint: Option<&str>) -> Result<PathBuf, StorageError> {
        let ext = extension_hint(hint);
        Ok(self.shard_dir(id)?.join(format!("{id}{ext}")))
    }

    /// Compute the blob path and make sure its shard directory exists.
    pub async fn allocate(&self, id: &str, hint: Option<&str>) -> Result<PathBuf, StorageError> {
        let path = self.path_for(id, hint)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }
}
