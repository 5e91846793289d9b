//! File storage abstraction layer.
//!
//! Generated documents are written through the [`FileStorage`] trait so the
//! business logic does not care whether files end up on the local
//! filesystem or in an object store.
//!
//! # Example
//!
//! ```ignore
//! use scolarite_core::file_storage::{FileStorage, LocalFileStorage};
//! use std::path::PathBuf;
//!
//! let storage = LocalFileStorage::new(
//!     PathBuf::from("./storage/documents"),
//!     "/documents".to_string(),
//! );
//!
//! // Save a file
//! let stored = storage.save("draft/AS-2025-001-draft.pdf", &bytes).await?;
//!
//! // Public path served by the static file service
//! assert_eq!(stored.public_path, "/documents/draft/AS-2025-001-draft.pdf");
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use thiserror::Error;
use tokio::fs;

/// Boxed future returned by [`FileStorage`] operations.
pub type StorageFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StorageError>> + Send + 'a>>;

/// Location of a file after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Storage key (e.g. `final/AS-2025-001-final.pdf`)
    pub key: String,
    /// Absolute filesystem path of the written file
    pub absolute_path: PathBuf,
    /// Externally reachable path (e.g. `/documents/final/AS-2025-001-final.pdf`)
    pub public_path: String,
}

/// Abstract trait for file storage backends.
///
/// Implementations can be swapped without changing business logic.
pub trait FileStorage: Send + Sync {
    /// Save file content under `key`, replacing any existing file.
    ///
    /// Writes are direct: a concurrent reader may observe a partially
    /// written file.
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, StoredFile>;

    /// Delete a file by key. Missing files are not an error.
    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()>;

    /// Absolute filesystem path a key maps to.
    fn absolute_path(&self, key: &str) -> Result<PathBuf, StorageError>;

    /// Public path a key is served under.
    fn public_path(&self, key: &str) -> Result<String, StorageError>;
}

/// Error type for file storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File exceeds maximum allowed size.
    #[error("File exceeds maximum size of {max_bytes} bytes")]
    InvalidFileSize { max_bytes: usize },

    /// I/O error (file system or similar).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// File not found.
    #[error("File not found")]
    NotFound,

    /// Invalid storage key format.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Local filesystem-based file storage implementation.
#[derive(Clone, Debug)]
pub struct LocalFileStorage {
    /// Base directory where files are stored
    base_dir: PathBuf,

    /// Public prefix the base directory is served under (e.g. "/documents")
    public_prefix: String,

    /// Maximum file size in bytes
    max_file_size: usize,
}

impl LocalFileStorage {
    /// Create a new local file storage instance with a 10MB size limit.
    pub fn new(base_dir: PathBuf, public_prefix: String) -> Self {
        Self::with_max_size(base_dir, public_prefix, 10 * 1024 * 1024)
    }

    /// Create a new local file storage with custom max file size.
    pub fn with_max_size(base_dir: PathBuf, public_prefix: String, max_file_size: usize) -> Self {
        Self {
            base_dir,
            public_prefix,
            max_file_size,
        }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Validate storage key format to prevent path traversal.
    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(
                "Key must not be empty, contain '..', or start with a separator".to_string(),
            ));
        }

        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/' || c == '.')
        {
            return Err(StorageError::InvalidKey(
                "Key contains invalid characters".to_string(),
            ));
        }

        Ok(())
    }
}

impl FileStorage for LocalFileStorage {
    fn save<'a>(&'a self, key: &'a str, content: &'a [u8]) -> StorageFuture<'a, StoredFile> {
        Box::pin(async move {
            Self::validate_key(key)?;

            if content.len() > self.max_file_size {
                return Err(StorageError::InvalidFileSize {
                    max_bytes: self.max_file_size,
                });
            }

            let file_path = self.absolute_path(key)?;

            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).await?;
            }

            fs::write(&file_path, content).await?;

            tracing::debug!(key = %key, bytes = content.len(), "Stored file");

            Ok(StoredFile {
                key: key.to_string(),
                public_path: self.public_path(key)?,
                absolute_path: file_path,
            })
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StorageFuture<'a, ()> {
        Box::pin(async move {
            let file_path = self.absolute_path(key)?;

            match fs::remove_file(&file_path).await {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn absolute_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        Self::validate_key(key)?;

        let base = if self.base_dir.is_absolute() {
            self.base_dir.clone()
        } else {
            std::env::current_dir()?.join(&self.base_dir)
        };

        Ok(base.join(key))
    }

    fn public_path(&self, key: &str) -> Result<String, StorageError> {
        Self::validate_key(key)?;

        Ok(format!("{}/{}", self.public_prefix.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_valid_keys() {
        assert!(LocalFileStorage::validate_key("draft/AS-2025-001-draft.pdf").is_ok());
        assert!(LocalFileStorage::validate_key("final/RN-2024-012-final.pdf").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_path_traversal() {
        assert!(LocalFileStorage::validate_key("../../../etc/passwd").is_err());
        assert!(LocalFileStorage::validate_key("..\\windows\\system32").is_err());
    }

    #[test]
    fn test_validate_key_rejects_absolute_paths() {
        assert!(LocalFileStorage::validate_key("/etc/passwd").is_err());
        assert!(LocalFileStorage::validate_key("\\windows\\system32").is_err());
    }

    #[test]
    fn test_public_path_handles_trailing_slash() {
        let storage = LocalFileStorage::new(PathBuf::from("/srv/docs"), "/documents/".to_string());

        let path = storage.public_path("final/AS-2025-001-final.pdf").unwrap();
        assert_eq!(path, "/documents/final/AS-2025-001-final.pdf");
    }

    #[tokio::test]
    async fn test_save_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf(), "/documents".to_string());

        let first = storage.save("draft/X-draft.pdf", b"first").await.unwrap();
        let second = storage.save("draft/X-draft.pdf", b"second").await.unwrap();

        assert_eq!(first.absolute_path, second.absolute_path);
        assert_eq!(std::fs::read(&second.absolute_path).unwrap(), b"second");
        assert_eq!(second.public_path, "/documents/draft/X-draft.pdf");
    }

    #[tokio::test]
    async fn test_save_rejects_oversized_content() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            LocalFileStorage::with_max_size(dir.path().to_path_buf(), "/documents".to_string(), 4);

        let result = storage.save("draft/big.pdf", b"too large").await;
        assert!(matches!(
            result,
            Err(StorageError::InvalidFileSize { max_bytes: 4 })
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalFileStorage::new(dir.path().to_path_buf(), "/documents".to_string());

        assert!(storage.delete("final/none.pdf").await.is_ok());
    }
}
