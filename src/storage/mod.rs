//! Blob store abstraction for raw uploaded files.
//!
//! The trait is the seam for an S3-style backend; the bundled implementation
//! stores blobs under a configured directory with atomic tmp-then-rename
//! writes. A missing blob during `remove` is logged and swallowed so that a
//! dangling metadata reference can always be cleaned up.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::StorageError;

#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write `bytes` under `key`, overwriting any previous object.
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str)
        -> Result<(), StorageError>;

    /// Read the object stored under `key`.
    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the object stored under `key`. A missing object is not an
    /// error: delete flows must never be blocked by an already-absent blob.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Public URL for the object under `key`.
    fn public_url(&self, key: &str) -> String;
}

/// Collision-resistant storage key: actor prefix, millisecond timestamp and
/// a sanitized form of the original filename.
pub fn storage_key(actor_id: Uuid, original_name: &str) -> String {
    format!(
        "{}/files/{}-{}",
        actor_id,
        Utc::now().timestamp_millis(),
        sanitize_file_name(original_name)
    )
}

fn sanitize_file_name(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(name)
        .trim();
    let cleaned: String = base
        .chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .filter(|ch| *ch != '\0')
        .collect();
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Filesystem-backed blob store rooted at a configured directory.
pub struct FilesystemBackend {
    root: PathBuf,
    public_base_url: String,
}

impl FilesystemBackend {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        // Keys are generated internally; stripping path traversal segments
        // keeps an externally supplied key inside the root.
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                continue;
            }
            path.push(segment);
        }
        path
    }

    fn upload_err(key: &str, source: std::io::Error) -> StorageError {
        StorageError::UploadFailed {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), StorageError> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::upload_err(key, e))?;
        }

        // Write to a sibling tmp file and rename, so a crash mid-write never
        // leaves a half-written blob under the final key.
        let tmp = path.with_extension("tmp-upload");
        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| Self::upload_err(key, e))?;
        file.write_all(bytes)
            .await
            .map_err(|e| Self::upload_err(key, e))?;
        file.sync_all()
            .await
            .map_err(|e| Self::upload_err(key, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::upload_err(key, e))?;

        debug!(key, size = bytes.len(), content_type, "blob stored");
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.blob_path(key))
            .await
            .map_err(|e| StorageError::ReadFailed {
                key: key.to_string(),
                source: e,
            })
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.blob_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(key, "blob already absent during remove; continuing");
                Ok(())
            }
            Err(e) => Err(StorageError::DeleteFailed {
                key: key.to_string(),
                source: e,
            }),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.blob_path(key))
            .await
            .unwrap_or(false))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}
