//! # Sync Coordinator
//!
//! Sequences one bookmark sync run.
//!
//! ## Workflow
//!
//! 1. Validate settings and make sure the Markdown folder exists
//! 2. Prune old backups, leaving room for the one about to be made
//! 3. Move the previous note into the backup folder
//! 4. Load the XBEL export (storage or WebDAV) and parse it
//! 5. Load the fetch ledger (enrichment only)
//! 6. Render the note and write it
//! 7. Fetch pending enrichment content and persist the ledger, in a detached task
//!
//! A failure in steps 1-6 aborts the run before the note is written. Failures
//! in step 7 are per item and never abort the batch.
//!
//! ## Backup order
//!
//! Pruning happens before the backup and keeps `keep_count - 1` files, so the
//! fresh backup is never a pruning candidate and the folder holds at most
//! `keep_count` backups once the note is moved. A backup that fails leaves the
//! folder already within bounds. With `keep_count` 0 every backup is pruned and
//! no new one is taken.
//!
//! ## Overlapping runs
//!
//! Only one run may be in flight at a time, including its detached fetch
//! task. A request that arrives while a run holds the guard is rejected with
//! [`SyncError::SyncInProgress`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::SyncCoordinator;
//! use core_runtime::events::SyncTrigger;
//!
//! let coordinator = SyncCoordinator::new(storage, http, clock, event_bus);
//! let report = coordinator.sync(&settings, SyncTrigger::Manual).await?;
//! println!("Rendered {} bookmarks", report.bookmarks);
//!
//! if let Some(summary) = report.wait_for_fetch().await? {
//!     println!("Fetched {} pages", summary.fetched.len());
//! }
//! ```

use crate::{
    backup::BackupRotator,
    fetcher::{FetchSummary, RateLimitedFetcher},
    ledger::{self, FetchLedger},
    render::{render, RenderOptions},
    source::{SourceLoader, SourceLocation},
    xbel::parse_xbel,
    Result, SyncError,
};
use bridge_traits::{http::HttpClient, storage::Storage, time::Clock};
use core_runtime::config::Settings;
use core_runtime::events::{CoreEvent, EventBus, SyncEvent, SyncTrigger};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Identifier of a single sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of a run whose note has been written
#[derive(Debug)]
pub struct SyncReport {
    pub run_id: RunId,
    pub output_path: PathBuf,
    /// Bookmark lines written to the note
    pub bookmarks: usize,
    /// Enrichment fetches dispatched
    pub pending: usize,
    /// Detached fetch task, present when `pending > 0`
    pub fetch: Option<JoinHandle<FetchSummary>>,
}

impl SyncReport {
    /// Wait for the detached fetch task, if any.
    pub async fn wait_for_fetch(self) -> Result<Option<FetchSummary>> {
        match self.fetch {
            Some(handle) => handle
                .await
                .map(Some)
                .map_err(|e| SyncError::TaskFailed(e.to_string())),
            None => Ok(None),
        }
    }
}

/// Orchestrates bookmark sync runs
pub struct SyncCoordinator {
    storage: Arc<dyn Storage>,
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    run_guard: Arc<Mutex<()>>,
}

impl SyncCoordinator {
    pub fn new(
        storage: Arc<dyn Storage>,
        http: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            storage,
            http,
            clock,
            event_bus,
            run_guard: Arc::new(Mutex::new(())),
        }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Whether a run (or its fetch task) currently holds the guard
    pub fn is_sync_active(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Run the full pipeline once.
    ///
    /// Returns as soon as the note is written; enrichment continues in
    /// [`SyncReport::fetch`].
    pub async fn sync(&self, settings: &Settings, trigger: SyncTrigger) -> Result<SyncReport> {
        let guard = self.acquire(trigger)?;
        self.run(settings, trigger, guard).await
    }

    /// Delete the fetch ledger, then sync.
    ///
    /// A missing ledger file is fine. Any other deletion error aborts.
    pub async fn resync(&self, settings: &Settings) -> Result<SyncReport> {
        let guard = self.acquire(SyncTrigger::Resync)?;

        if let Err(e) = ledger::clear(self.storage.as_ref(), &settings.ledger_path()).await {
            error!(error = %e, "Resync aborted: cannot delete fetch ledger");
            return Err(e);
        }

        self.run(settings, SyncTrigger::Resync, guard).await
    }

    fn acquire(&self, trigger: SyncTrigger) -> Result<OwnedMutexGuard<()>> {
        Arc::clone(&self.run_guard).try_lock_owned().map_err(|_| {
            warn!(trigger = %trigger, "Sync already in progress, request rejected");
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::Rejected { trigger }))
                .ok();
            SyncError::SyncInProgress
        })
    }

    #[instrument(skip(self, settings, trigger, guard), fields(trigger = %trigger))]
    async fn run(
        &self,
        settings: &Settings,
        trigger: SyncTrigger,
        guard: OwnedMutexGuard<()>,
    ) -> Result<SyncReport> {
        let run_id = RunId::new();
        info!(run_id = %run_id, "Starting bookmark sync");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                run_id: run_id.to_string(),
                trigger,
            }))
            .ok();

        match self.execute(run_id, settings, guard).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Bookmark sync failed");
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        run_id: run_id.to_string(),
                        message: e.to_string(),
                    }))
                    .ok();
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        run_id: RunId,
        settings: &Settings,
        guard: OwnedMutexGuard<()>,
    ) -> Result<SyncReport> {
        settings
            .validate()
            .map_err(|e| SyncError::Config(e.to_string()))?;

        let md_folder = settings.md_folder();
        let output_path = settings.output_path();
        self.storage.create_dir_all(&md_folder).await?;

        info!("Phase 1: Rotating backups");
        let rotator = BackupRotator::new(Arc::clone(&self.storage), Arc::clone(&self.clock));
        rotator
            .prune(&settings.backup_folder_path, settings.keep_count)
            .await;
        if settings.keep_count == 0 {
            debug!("keepCount is 0, previous note is overwritten without a backup");
        } else if self.storage.exists(&output_path).await? {
            rotator
                .backup(&output_path, &settings.backup_folder_path)
                .await?;
        } else {
            debug!(path = %output_path.display(), "No previous note to back up");
        }

        info!("Phase 2: Loading bookmark export");
        let location = SourceLocation::from_settings(settings)?;
        let loader = SourceLoader::new(Arc::clone(&self.storage), Arc::clone(&self.http));
        let xml = loader.load(&location).await?;
        let tree = parse_xbel(&xml)?;

        info!("Phase 3: Rendering note");
        let known = if settings.enrichment_enabled() {
            FetchLedger::load(self.storage.as_ref(), &md_folder, &settings.ledger_path()).await
        } else {
            FetchLedger::default()
        };
        let rendered = render(
            &tree,
            &known,
            RenderOptions {
                html2md_api: &settings.html2md_api,
                md_folder: &settings.md_folder_path,
            },
        );

        self.storage
            .write_file(&output_path, rendered.markdown.into_bytes().into())
            .await?;
        let pending = rendered.pending.len();
        info!(
            path = %output_path.display(),
            bookmarks = rendered.bookmarks,
            pending,
            "Wrote bookmarks note"
        );
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::OutputWritten {
                run_id: run_id.to_string(),
                path: output_path.display().to_string(),
                bookmarks: rendered.bookmarks,
                pending_fetches: pending,
            }))
            .ok();

        let fetch = if pending > 0 {
            info!("Phase 4: Dispatching {} fetches", pending);
            Some(self.spawn_fetch(
                run_id,
                settings,
                rendered.pending.into_items(),
                known,
                guard,
            ))
        } else {
            drop(guard);
            None
        };

        Ok(SyncReport {
            run_id,
            output_path,
            bookmarks: rendered.bookmarks,
            pending,
            fetch,
        })
    }

    /// Fetch and persist the ledger in the background. The run guard is held
    /// until the ledger is written.
    fn spawn_fetch(
        &self,
        run_id: RunId,
        settings: &Settings,
        items: Vec<crate::render::PendingFetch>,
        mut known: FetchLedger,
        guard: OwnedMutexGuard<()>,
    ) -> JoinHandle<FetchSummary> {
        let fetcher = RateLimitedFetcher::new(
            Arc::clone(&self.http),
            Arc::clone(&self.storage),
            settings.fetch_interval(),
        );
        let storage = Arc::clone(&self.storage);
        let event_bus = self.event_bus.clone();
        let ledger_path = settings.ledger_path();

        tokio::spawn(async move {
            let summary = fetcher.run(&items).await;

            known.extend(summary.fetched.iter().cloned());
            persist_ledger(storage.as_ref(), &known, &ledger_path).await;

            info!(
                run_id = %run_id,
                fetched = summary.fetched.len(),
                failed = summary.failed.len(),
                "Bookmark sync finished"
            );
            event_bus
                .emit(CoreEvent::Sync(SyncEvent::FetchCompleted {
                    run_id: run_id.to_string(),
                    fetched: summary.fetched.len(),
                    failed: summary.failed.len(),
                }))
                .ok();

            drop(guard);
            summary
        })
    }
}

async fn persist_ledger(storage: &dyn Storage, known: &FetchLedger, ledger_path: &Path) {
    if let Err(e) = known.save(storage, ledger_path).await {
        warn!(path = %ledger_path.display(), error = %e, "Failed to persist fetch ledger");
    }
}
