//! Storage Abstraction
//!
//! A single storage capability used for every file the sync pipeline touches:
//! the XBEL source (when local), the generated note, enrichment files, the
//! fetch ledger and the backup folder.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    /// Last modification time, unix milliseconds
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// Storage capability trait
///
/// Implementations exist for the real filesystem (`bridge-desktop`) and for
/// memory ([`MemoryStorage`](crate::memory::MemoryStorage)), so the pipeline
/// can be exercised without touching disk.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::Storage;
///
/// async fn save_note(storage: &dyn Storage, body: String) -> Result<()> {
///     storage.create_dir_all(Path::new("notes")).await?;
///     storage.write_file(Path::new("notes/bookmarks.md"), body.into()).await
/// }
/// ```
#[async_trait]
pub trait Storage: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, replacing any previous content
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// List the files in a directory.
    ///
    /// Directories are never returned themselves. With `recursive` set, files
    /// in nested directories at any depth are included.
    async fn list_directory(&self, path: &Path, recursive: bool) -> Result<Vec<PathBuf>>;

    /// Move a file, replacing the destination if it exists
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a file
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Read a file as UTF-8 text
    async fn read_to_string(&self, path: &Path) -> Result<String> {
        let data = self.read_file(path).await?;
        String::from_utf8(data.to_vec()).map_err(|e| {
            BridgeError::OperationFailed(format!("{} is not valid UTF-8: {}", path.display(), e))
        })
    }
}
