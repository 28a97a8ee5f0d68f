//! Storage Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{FileMetadata, Storage},
};
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

/// Tokio-based filesystem storage
///
/// Paths are used as given. An empty path refers to the working directory.
#[derive(Debug, Clone, Default)]
pub struct TokioStorage;

impl TokioStorage {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError, keeping "not found" distinct
    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        if e.kind() == ErrorKind::NotFound {
            BridgeError::NotFound(path.to_path_buf())
        } else {
            BridgeError::Io(e)
        }
    }

    fn effective(path: &Path) -> &Path {
        if path.as_os_str().is_empty() {
            Path::new(".")
        } else {
            path
        }
    }

    fn millis(time: SystemTime) -> Option<i64> {
        time.duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis() as i64)
    }
}

#[async_trait]
impl Storage for TokioStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        fs::try_exists(Self::effective(path))
            .await
            .map_err(|e| Self::map_io_error(path, e))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let metadata = fs::metadata(Self::effective(path))
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        Ok(FileMetadata {
            size: metadata.len(),
            modified_at: metadata.modified().ok().and_then(Self::millis),
            is_directory: metadata.is_dir(),
        })
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![path.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut read_dir = fs::read_dir(Self::effective(&dir))
                .await
                .map_err(|e| Self::map_io_error(&dir, e))?;

            while let Some(entry) = read_dir
                .next_entry()
                .await
                .map_err(|e| Self::map_io_error(&dir, e))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| Self::map_io_error(&dir, e))?;
                let entry_path = dir.join(entry.file_name());

                if file_type.is_dir() {
                    if recursive {
                        pending.push(entry_path);
                    }
                } else {
                    files.push(entry_path);
                }
            }
        }

        files.sort();
        debug!(path = ?path, count = files.len(), recursive, "Listed directory");
        Ok(files)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to)
            .await
            .map_err(|e| Self::map_io_error(from, e))?;
        debug!(from = ?from, to = ?to, "Renamed file");
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }
}
