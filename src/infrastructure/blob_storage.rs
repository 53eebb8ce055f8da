// Blob Storage - binary objects (event covers, venue photos) addressed by slash paths

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use crate::error::{AppError, AppResult};

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `path`, returning the public path of the blob.
    async fn upload(&self, path: &str, bytes: &[u8]) -> AppResult<String>;

    async fn download(&self, path: &str) -> AppResult<Option<Vec<u8>>>;

    /// Returns false when nothing was stored at `path`.
    async fn delete(&self, path: &str) -> AppResult<bool>;

    /// Delete every blob under `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> AppResult<usize>;
}

/// Filesystem-backed blob store rooted at a directory
pub struct LocalBlobStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalBlobStore {
    pub async fn new(root: impl Into<PathBuf>, public_prefix: &str) -> AppResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(|e| {
            AppError::StorageError(format!("Failed to create blob root {}: {}", root.display(), e))
        })?;
        Ok(Self {
            root,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }

    /// Map a blob path (or its public URL form) onto the filesystem, refusing traversal.
    fn resolve(&self, path: &str) -> AppResult<PathBuf> {
        let relative = path
            .strip_prefix(self.public_prefix.as_str())
            .unwrap_or(path)
            .split('?')
            .next()
            .unwrap_or_default()
            .trim_start_matches('/');

        let candidate = Path::new(relative);
        let safe = !relative.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::Validation(format!("Invalid blob path: {}", path)));
        }
        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, path: &str, bytes: &[u8]) -> AppResult<String> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await.map_err(|e| {
            AppError::StorageError(format!("Failed to write blob {}: {}", path, e))
        })?;
        Ok(format!("{}/{}", self.public_prefix, path.trim_start_matches('/')))
    }

    async fn download(&self, path: &str) -> AppResult<Option<Vec<u8>>> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::StorageError(format!("Failed to read blob {}: {}", path, e))),
        }
    }

    async fn delete(&self, path: &str) -> AppResult<bool> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::StorageError(format!("Failed to delete blob {}: {}", path, e))),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> AppResult<usize> {
        let target = self.resolve(prefix)?;
        let mut removed = 0;
        let mut pending = vec![target.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_dir() {
                    pending.push(entry.path());
                } else {
                    tokio::fs::remove_file(entry.path()).await?;
                    removed += 1;
                }
            }
        }

        if tokio::fs::metadata(&target).await.is_ok() {
            tokio::fs::remove_dir_all(&target).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_download_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/blobs").await.unwrap();

        let url = store.upload("events/e1/cover.png", b"png").await.unwrap();
        assert_eq!(url, "/blobs/events/e1/cover.png");
        assert_eq!(store.download(&url).await.unwrap().unwrap(), b"png");

        assert!(store.delete(&url).await.unwrap());
        assert!(!store.delete("events/e1/cover.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_prefix_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/blobs").await.unwrap();
        store.upload("venues/v1/a.jpg", b"a").await.unwrap();
        store.upload("venues/v1/gallery/b.jpg", b"b").await.unwrap();
        store.upload("venues/v2/c.jpg", b"c").await.unwrap();

        assert_eq!(store.delete_prefix("venues/v1").await.unwrap(), 2);
        assert!(store.download("venues/v2/c.jpg").await.unwrap().is_some());
        assert_eq!(store.delete_prefix("venues/none").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path(), "/blobs").await.unwrap();
        assert!(store.upload("../escape.txt", b"x").await.is_err());
        assert!(store.delete("/").await.is_err());
    }
}
