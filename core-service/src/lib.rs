//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (storage, HTTP,
//! clock) and the persisted [`Settings`] into a [`SyncCoordinator`], and owns
//! everything that decides *when* a sync runs: once at start, on demand, after
//! a settings change and on the optional periodic timer. Desktop apps enable
//! the `desktop-shims` feature (which depends on `bridge-desktop`) and call
//! [`bootstrap_desktop`].

pub mod error;
mod scheduler;

pub use error::{CoreError, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::{http::HttpClient, storage::Storage, time::Clock};
use core_runtime::config::Settings;
use core_runtime::events::{EventBus, EventStream, SyncTrigger};
use core_sync::{SyncCoordinator, SyncReport};
use scheduler::Scheduler;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Aggregated handle to all bridge dependencies the core requires.
pub struct CoreDependencies {
    pub storage: Arc<dyn Storage>,
    pub http_client: Arc<dyn HttpClient>,
    pub clock: Arc<dyn Clock>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    pub fn new(
        storage: Arc<dyn Storage>,
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            http_client,
            clock,
        }
    }
}

/// Primary façade exposed to host applications.
pub struct BookmarkSyncService {
    deps: Arc<CoreDependencies>,
    settings_path: PathBuf,
    settings: Arc<RwLock<Settings>>,
    coordinator: Arc<SyncCoordinator>,
    scheduler: Mutex<Option<Scheduler>>,
}

impl BookmarkSyncService {
    /// Create a service, loading settings from `settings_path` (defaults when
    /// the file does not exist).
    pub async fn new(deps: CoreDependencies, settings_path: impl Into<PathBuf>) -> Result<Self> {
        let settings_path = settings_path.into();
        let settings = Settings::load(deps.storage.as_ref(), &settings_path).await?;
        Ok(Self::with_settings(deps, settings_path, settings))
    }

    /// Create a service from already-loaded settings.
    pub fn with_settings(
        deps: CoreDependencies,
        settings_path: impl Into<PathBuf>,
        settings: Settings,
    ) -> Self {
        let coordinator = SyncCoordinator::new(
            Arc::clone(&deps.storage),
            Arc::clone(&deps.http_client),
            Arc::clone(&deps.clock),
            EventBus::default(),
        );

        Self {
            deps: Arc::new(deps),
            settings_path: settings_path.into(),
            settings: Arc::new(RwLock::new(settings)),
            coordinator: Arc::new(coordinator),
            scheduler: Mutex::new(None),
        }
    }

    /// Access the bridge dependencies being used by the service.
    pub fn dependencies(&self) -> Arc<CoreDependencies> {
        Arc::clone(&self.deps)
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Snapshot of the current settings
    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.coordinator.event_bus().subscribe())
    }

    pub fn is_sync_active(&self) -> bool {
        self.coordinator.is_sync_active()
    }

    /// Arm the timer (if enabled) and run the startup sync.
    ///
    /// The timer is armed even when the startup sync fails, so a source that
    /// is temporarily unreachable is picked up on the next tick.
    pub async fn start(&self) -> Result<SyncReport> {
        self.restart_scheduler().await;
        info!("Running startup sync");
        self.run(SyncTrigger::Startup).await
    }

    /// Run a sync now.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        self.run(SyncTrigger::Manual).await
    }

    /// Delete the fetch ledger and run a sync.
    pub async fn resync(&self) -> Result<SyncReport> {
        let settings = self.settings().await;
        Ok(self.coordinator.resync(&settings).await?)
    }

    /// Validate, persist and apply new settings, then sync with them.
    ///
    /// Invalid settings are rejected before anything is written.
    pub async fn update_settings(&self, settings: Settings) -> Result<SyncReport> {
        settings.validate()?;
        settings
            .save(self.deps.storage.as_ref(), &self.settings_path)
            .await?;
        *self.settings.write().await = settings;
        info!(path = %self.settings_path.display(), "Settings updated");

        self.restart_scheduler().await;
        self.run(SyncTrigger::SettingsChanged).await
    }

    /// Stop the timer. In-flight fetch tasks finish on their own.
    pub async fn shutdown(&self) {
        if let Some(scheduler) = self.scheduler.lock().await.take() {
            scheduler.stop().await;
        }
    }

    async fn run(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let settings = self.settings().await;
        Ok(self.coordinator.sync(&settings, trigger).await?)
    }

    async fn restart_scheduler(&self) {
        let mut slot = self.scheduler.lock().await;
        if let Some(previous) = slot.take() {
            previous.stop().await;
        }

        match self.settings.read().await.update_period() {
            Some(period) => {
                *slot = Some(Scheduler::start(
                    Arc::clone(&self.coordinator),
                    Arc::clone(&self.settings),
                    period,
                ));
            }
            None => info!("Automatic updates disabled"),
        }
    }
}

impl Drop for BookmarkSyncService {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.scheduler.try_lock() {
            if let Some(scheduler) = slot.take() {
                scheduler.cancel();
            }
        }
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Uses the real filesystem, a reqwest HTTP client and the system clock.
/// `settings_path` defaults to `<config dir>/xbel-notes/settings.json`.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let service = core_service::bootstrap_desktop(None).await?;
/// let report = service.sync_now().await?;
/// println!("Wrote {} bookmarks", report.bookmarks);
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(settings_path: Option<PathBuf>) -> Result<BookmarkSyncService> {
    use bridge_desktop::{ReqwestHttpClient, TokioStorage};
    use bridge_traits::time::SystemClock;

    let settings_path = match settings_path {
        Some(path) => path,
        None => core_runtime::config::default_settings_path()?,
    };
    let http = ReqwestHttpClient::new()
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let deps = CoreDependencies::new(
        Arc::new(TokioStorage::new()),
        Arc::new(http),
        Arc::new(SystemClock),
    );
    BookmarkSyncService::new(deps, settings_path).await
}
