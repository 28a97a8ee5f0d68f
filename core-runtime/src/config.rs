//! # Settings
//!
//! The configuration record read at the start of every sync run.
//!
//! ## Overview
//!
//! Settings are persisted as a JSON object with camelCase keys. Any key missing
//! from the stored object falls back to its default, so an older or partial
//! settings file keeps working after new options are added.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::Settings;
//!
//! let settings = Settings::load(storage.as_ref(), &path).await?;
//! settings.validate()?;
//!
//! let output = settings.output_path();
//! ```
//!
//! ## Locations
//!
//! Folder settings are plain strings. An empty folder means "relative to the
//! working directory", and every file location is composed with
//! [`join_location`] so that the ledger keys and the paths written by the
//! fetcher always agree.

use crate::error::{Error, Result};
use bridge_traits::storage::Storage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Name of the fetch ledger file kept inside the Markdown folder
pub const LEDGER_FILE_NAME: &str = ".bks.json";

/// Application directory name used under the platform config dir
pub const APP_DIR_NAME: &str = "xbel-notes";

/// Default HTML-to-Markdown API prefix
pub const DEFAULT_HTML2MD_API: &str = "https://r.jina.ai/";

/// Sync configuration record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Folder holding the XBEL export, or an http(s) WebDAV collection URL
    pub xbel_folder_path: String,
    pub xbel_file_name: String,
    /// Folder receiving the generated note and enrichment files
    pub md_folder_path: String,
    pub md_file_name: String,
    pub backup_folder_path: String,
    /// Number of backups retained after each rotation
    pub keep_count: u32,
    pub automatic_update: bool,
    /// Timer period in minutes
    pub update_interval: u64,
    /// Prefix prepended to every bookmark URL for enrichment; empty disables it
    #[serde(rename = "html2mdApi")]
    pub html2md_api: String,
    /// Pause after every enrichment fetch, in milliseconds
    pub fetch_interval_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            xbel_folder_path: String::new(),
            xbel_file_name: "bookmarks.xbel".to_string(),
            md_folder_path: String::new(),
            md_file_name: "bookmarks.md".to_string(),
            backup_folder_path: String::new(),
            keep_count: 5,
            automatic_update: false,
            update_interval: 1920,
            html2md_api: DEFAULT_HTML2MD_API.to_string(),
            fetch_interval_ms: 900,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file is absent.
    pub async fn load(storage: &dyn Storage, path: &Path) -> Result<Self> {
        match storage.read_to_string(path).await {
            Ok(raw) => {
                let settings: Settings = serde_json::from_str(&raw)?;
                debug!(path = %path.display(), "Loaded settings");
                Ok(settings)
            }
            Err(e) if e.is_not_found() => {
                info!(path = %path.display(), "No settings file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist settings as pretty-printed JSON.
    pub async fn save(&self, storage: &dyn Storage, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        storage.write_file(path, json.into_bytes().into()).await?;
        debug!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        if self.xbel_file_name.trim().is_empty() {
            return Err(Error::Config("XBEL file name cannot be empty".to_string()));
        }

        if self.md_file_name.trim().is_empty() {
            return Err(Error::Config(
                "Markdown file name cannot be empty".to_string(),
            ));
        }

        if self.automatic_update && self.update_interval == 0 {
            return Err(Error::Config(
                "Update interval must be at least 1 minute when automatic update is on"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Whether the XBEL source is fetched over HTTP rather than read from storage
    pub fn is_remote_source(&self) -> bool {
        is_http_url(&self.xbel_folder_path)
    }

    /// Full location of the XBEL export (path or URL)
    pub fn source_location(&self) -> String {
        join_location(&self.xbel_folder_path, &self.xbel_file_name)
    }

    pub fn output_path(&self) -> PathBuf {
        PathBuf::from(join_location(&self.md_folder_path, &self.md_file_name))
    }

    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(join_location(&self.md_folder_path, LEDGER_FILE_NAME))
    }

    pub fn md_folder(&self) -> PathBuf {
        PathBuf::from(&self.md_folder_path)
    }

    pub fn enrichment_enabled(&self) -> bool {
        !self.html2md_api.is_empty()
    }

    pub fn fetch_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_interval_ms)
    }

    /// Timer period, or `None` when automatic updates are off
    pub fn update_period(&self) -> Option<Duration> {
        if self.automatic_update && self.update_interval > 0 {
            Some(Duration::from_secs(self.update_interval * 60))
        } else {
            None
        }
    }
}

/// Default settings file location: `<config dir>/xbel-notes/settings.json`
pub fn default_settings_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join("settings.json"))
        .ok_or_else(|| Error::Config("No configuration directory on this platform".to_string()))
}

/// Compose `folder/name`.
///
/// An empty folder yields `name` unchanged; trailing slashes on the folder are
/// ignored.
pub fn join_location(folder: &str, name: &str) -> String {
    let trimmed = folder.trim_end_matches('/');
    if trimmed.is_empty() {
        if folder.is_empty() {
            name.to_string()
        } else {
            format!("/{}", name)
        }
    } else {
        format!("{}/{}", trimmed, name)
    }
}

fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}
