//! # Bookmark Sync Pipeline
//!
//! Turns an XBEL bookmark export into a Markdown note and keeps a folder of
//! per-bookmark enrichment files up to date.
//!
//! ## Overview
//!
//! A run reads the export from storage or a WebDAV server, renders the folder
//! tree as headings and links, rotates the previous note into a backup folder
//! and writes the new one. When an HTML-to-Markdown API is configured, every
//! bookmark without an enrichment file is fetched through it afterwards, one
//! request at a time.
//!
//! ## Components
//!
//! - **XBEL Parser** (`xbel`): Bookmark tree from XBEL text
//! - **Renderer** (`render`): Markdown note and enrichment work-list
//! - **Fetch Ledger** (`ledger`): Paths that already have content
//! - **Fetcher** (`fetcher`): Sequential, rate-limited enrichment downloads
//! - **Backup Rotator** (`backup`): Timestamped backups with bounded retention
//! - **Source Loader** (`source`): Local or WebDAV export retrieval
//! - **Sync Coordinator** (`coordinator`): Runs the pipeline end to end

pub mod backup;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod render;
pub mod source;
pub mod xbel;

pub use backup::{backup_file_name, is_backup_file_name, BackupRotator};
pub use coordinator::{RunId, SyncCoordinator, SyncReport};
pub use error::{Result, SyncError};
pub use fetcher::{FetchSummary, RateLimitedFetcher};
pub use ledger::FetchLedger;
pub use render::{render, sanitize_filename, FetchPlan, PendingFetch, RenderOptions, RenderOutput};
pub use source::{Credentials, SourceLoader, SourceLocation};
pub use xbel::{parse_xbel, Bookmark, BookmarkNode, Folder};
