//! # Backup Rotator
//!
//! Moves the previous note out of the way before it is regenerated and keeps
//! the backup folder bounded.
//!
//! Backups are named `<stem>-<YYYYMMDDHHMMSS>.<ext>` using local wall-clock
//! time, so names sort in creation order. Pruning only considers files that
//! follow this naming scheme; anything else in the folder is left alone.

use crate::error::{Result, SyncError};
use bridge_traits::{storage::Storage, time::Clock};
use chrono::NaiveDateTime;
use core_runtime::config::join_location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Timestamp format of the backup suffix
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

const TIMESTAMP_LEN: usize = 14;

/// Backup file name for `original` taken at `stamp`
pub fn backup_file_name(original: &Path, stamp: NaiveDateTime) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = stamp.format(BACKUP_TIMESTAMP_FORMAT);

    match original.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    }
}

/// Whether `name` looks like a file produced by [`backup_file_name`]
pub fn is_backup_file_name(name: &str) -> bool {
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name,
    };
    match stem.rsplit_once('-') {
        Some((_, stamp)) => {
            stamp.len() == TIMESTAMP_LEN && stamp.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

pub struct BackupRotator {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
}

impl BackupRotator {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Move `existing` into `backup_folder` under a timestamped name.
    ///
    /// The folder is created when missing. Afterwards `existing` no longer
    /// exists.
    pub async fn backup(&self, existing: &Path, backup_folder: &str) -> Result<PathBuf> {
        self.storage
            .create_dir_all(Path::new(backup_folder))
            .await
            .map_err(|e| SyncError::Backup(format!("cannot create {}: {}", backup_folder, e)))?;

        let name = backup_file_name(existing, self.clock.local_now());
        let target = PathBuf::from(join_location(backup_folder, &name));

        self.storage.rename(existing, &target).await.map_err(|e| {
            SyncError::Backup(format!(
                "cannot move {} to {}: {}",
                existing.display(),
                target.display(),
                e
            ))
        })?;

        info!(from = %existing.display(), to = %target.display(), "Backed up previous note");
        Ok(target)
    }

    /// Delete the oldest backups so that at most `keep_count - 1` remain,
    /// leaving room for the backup about to be made.
    ///
    /// Best-effort: failures are logged, never returned. Returns the number of
    /// files deleted.
    pub async fn prune(&self, backup_folder: &str, keep_count: u32) -> usize {
        let folder = Path::new(backup_folder);
        let files = match self.storage.list_directory(folder, false).await {
            Ok(files) => files,
            Err(e) if e.is_not_found() => return 0,
            Err(e) => {
                warn!(folder = %backup_folder, error = %e, "Cannot list backup folder");
                return 0;
            }
        };

        let mut backups = Vec::new();
        for path in files {
            let is_backup = path
                .file_name()
                .map(|n| is_backup_file_name(&n.to_string_lossy()))
                .unwrap_or(false);
            if !is_backup {
                continue;
            }
            let modified = match self.storage.metadata(&path).await {
                Ok(meta) => meta.modified_at.unwrap_or(0),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat backup");
                    0
                }
            };
            backups.push((modified, path));
        }

        // Oldest first; names break ties since they embed the timestamp
        backups.sort();

        let excess = (backups.len() + 1).saturating_sub(keep_count as usize);
        let mut deleted = 0;
        for (_, path) in backups.into_iter().take(excess) {
            match self.storage.remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), "Deleted old backup");
                    deleted += 1;
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete old backup"),
            }
        }

        if deleted > 0 {
            info!(deleted, keep_count, "Pruned backups");
        }
        deleted
    }
}
