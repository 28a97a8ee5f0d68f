//! # Fetch Ledger
//!
//! The set of output paths that already have content, so enrichment fetches
//! are not repeated across runs.
//!
//! The known set is the union of every file found under the Markdown folder
//! (any depth) and the paths recorded in the persisted ledger file. A file on
//! disk therefore always counts as present, whatever the ledger history says,
//! and a recorded path counts even after the file was removed by hand.
//!
//! Loading never fails: a missing folder, a missing ledger file or a corrupt
//! one are logged and treated as empty.

use crate::error::Result;
use bridge_traits::storage::Storage;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchLedger {
    known: BTreeSet<String>,
}

impl FetchLedger {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Build the known set from the files under `md_folder` and the ledger
    /// file at `ledger_path`.
    pub async fn load(storage: &dyn Storage, md_folder: &Path, ledger_path: &Path) -> Self {
        let mut ledger = Self::default();

        match storage.list_directory(md_folder, true).await {
            Ok(files) => {
                ledger
                    .known
                    .extend(files.iter().map(|p| p.to_string_lossy().into_owned()));
            }
            Err(e) if e.is_not_found() => {
                debug!(folder = %md_folder.display(), "Markdown folder does not exist yet");
            }
            Err(e) => {
                warn!(folder = %md_folder.display(), error = %e, "Failed to list Markdown folder");
            }
        }
        let on_disk = ledger.len();

        match storage.read_to_string(ledger_path).await {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(paths) => ledger.known.extend(paths),
                Err(e) => {
                    warn!(path = %ledger_path.display(), error = %e, "Ignoring corrupt fetch ledger");
                }
            },
            Err(e) if e.is_not_found() => {
                debug!(path = %ledger_path.display(), "No fetch ledger yet");
            }
            Err(e) => {
                warn!(path = %ledger_path.display(), error = %e, "Failed to read fetch ledger");
            }
        }

        debug!(on_disk, known = ledger.len(), "Loaded fetch ledger");
        ledger
    }

    pub fn contains(&self, path: &str) -> bool {
        self.known.contains(path)
    }

    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.known.insert(path.into())
    }

    pub fn extend<I, S>(&mut self, paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known.extend(paths.into_iter().map(Into::into));
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Known paths, sorted
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.known.iter().map(String::as_str)
    }

    /// Write the set as a sorted JSON array of strings, replacing the file.
    pub async fn save(&self, storage: &dyn Storage, ledger_path: &Path) -> Result<()> {
        let paths: Vec<&str> = self.iter().collect();
        let json = serde_json::to_string(&paths)?;
        storage
            .write_file(ledger_path, json.into_bytes().into())
            .await?;
        debug!(path = %ledger_path.display(), count = paths.len(), "Saved fetch ledger");
        Ok(())
    }
}

/// Delete the ledger file. Returns `false` when there was nothing to delete.
pub async fn clear(storage: &dyn Storage, ledger_path: &Path) -> Result<bool> {
    match storage.remove_file(ledger_path).await {
        Ok(()) => {
            info!(path = %ledger_path.display(), "Deleted fetch ledger");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            debug!(path = %ledger_path.display(), "No fetch ledger to delete");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::MemoryStorage;

    #[tokio::test]
    async fn test_load_unions_listing_and_ledger_file() {
        let storage = MemoryStorage::new();
        storage.insert("notes/Site.md", "content");
        storage.insert("notes/sub/Deep.md", "content");
        storage.insert("notes/.bks.json", r#"["notes/Deleted.md"]"#);

        let ledger =
            FetchLedger::load(&storage, Path::new("notes"), Path::new("notes/.bks.json")).await;

        assert!(ledger.contains("notes/Site.md"));
        assert!(ledger.contains("notes/sub/Deep.md"));
        assert!(ledger.contains("notes/Deleted.md"));
        assert!(ledger.contains("notes/.bks.json"));
        assert!(!ledger.contains("notes/Missing.md"));
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_treated_as_empty() {
        let storage = MemoryStorage::new();
        storage.insert("notes/.bks.json", "{not json");

        let ledger =
            FetchLedger::load(&storage, Path::new("notes"), Path::new("notes/.bks.json")).await;

        assert_eq!(ledger.iter().collect::<Vec<_>>(), vec!["notes/.bks.json"]);
    }

    #[tokio::test]
    async fn test_missing_folder_is_empty() {
        let storage = MemoryStorage::new();
        let ledger =
            FetchLedger::load(&storage, Path::new("notes"), Path::new("notes/.bks.json")).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_save_writes_sorted_unique_array() {
        let storage = MemoryStorage::new();
        let mut ledger = FetchLedger::from_paths(["notes/b.md", "notes/a.md"]);
        ledger.insert("notes/a.md");
        ledger.extend(["notes/c.md"]);

        ledger
            .save(&storage, Path::new("notes/.bks.json"))
            .await
            .unwrap();

        assert_eq!(
            storage.contents("notes/.bks.json").as_deref(),
            Some(r#"["notes/a.md","notes/b.md","notes/c.md"]"#)
        );
    }

    #[tokio::test]
    async fn test_clear_tolerates_missing_file() {
        let storage = MemoryStorage::new();
        storage.insert("notes/.bks.json", "[]");

        assert!(clear(&storage, Path::new("notes/.bks.json")).await.unwrap());
        assert!(!clear(&storage, Path::new("notes/.bks.json")).await.unwrap());
    }
}
