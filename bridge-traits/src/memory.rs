//! In-memory [`Storage`] backend.
//!
//! Modification times come from a logical counter, so the order in which files
//! were written is always observable even when several writes land within the
//! same millisecond.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{BridgeError, Result};
use crate::storage::{FileMetadata, Storage};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Bytes,
    modified_at: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<PathBuf, MemoryFile>,
    dirs: BTreeSet<PathBuf>,
    tick: i64,
}

impl MemoryState {
    fn next_tick(&mut self) -> i64 {
        self.tick += 1;
        self.tick
    }

    fn add_parents(&mut self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.dirs.contains(path) || self.files.keys().any(|f| f.starts_with(path) && f != path)
    }
}

/// Thread-safe in-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<MemoryState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| BridgeError::OperationFailed(format!("memory storage poisoned: {}", e)))
    }

    /// Insert a file synchronously, for test setup
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>) {
        let path = path.into();
        if let Ok(mut state) = self.lock() {
            let modified_at = state.next_tick();
            state.add_parents(&path);
            state.files.insert(
                path,
                MemoryFile {
                    data: data.into(),
                    modified_at,
                },
            );
        }
    }

    /// Content of a file as text, if present
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let state = self.lock().ok()?;
        let file = state.files.get(path.as_ref())?;
        Some(String::from_utf8_lossy(&file.data).into_owned())
    }

    /// Every stored file path, sorted
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock()
            .map(|state| state.files.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn exists(&self, path: &Path) -> Result<bool> {
        let state = self.lock()?;
        Ok(state.files.contains_key(path) || state.is_dir(path))
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        let state = self.lock()?;
        if let Some(file) = state.files.get(path) {
            return Ok(FileMetadata {
                size: file.data.len() as u64,
                modified_at: Some(file.modified_at),
                is_directory: false,
            });
        }
        if state.is_dir(path) {
            return Ok(FileMetadata {
                size: 0,
                modified_at: None,
                is_directory: true,
            });
        }
        Err(BridgeError::NotFound(path.to_path_buf()))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock()?;
        if state.files.contains_key(path) {
            return Err(BridgeError::OperationFailed(format!(
                "{} exists and is a file",
                path.display()
            )));
        }
        state.add_parents(path);
        state.dirs.insert(path.to_path_buf());
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let state = self.lock()?;
        state
            .files
            .get(path)
            .map(|f| f.data.clone())
            .ok_or_else(|| BridgeError::NotFound(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        let mut state = self.lock()?;
        if state.dirs.contains(path) {
            return Err(BridgeError::OperationFailed(format!(
                "{} is a directory",
                path.display()
            )));
        }
        let modified_at = state.next_tick();
        state.add_parents(path);
        state
            .files
            .insert(path.to_path_buf(), MemoryFile { data, modified_at });
        Ok(())
    }

    async fn list_directory(&self, path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        let state = self.lock()?;
        if !state.is_dir(path) {
            return Err(BridgeError::NotFound(path.to_path_buf()));
        }
        let entries = state
            .files
            .keys()
            .filter(|file| {
                if recursive {
                    file.starts_with(path)
                } else {
                    file.parent() == Some(path)
                }
            })
            .cloned()
            .collect();
        Ok(entries)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock()?;
        let file = state
            .files
            .remove(from)
            .ok_or_else(|| BridgeError::NotFound(from.to_path_buf()))?;
        state.add_parents(to);
        state.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.lock()?;
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| BridgeError::NotFound(path.to_path_buf()))
    }
}
