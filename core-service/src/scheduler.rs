//! Periodic sync timer.

use core_runtime::config::Settings;
use core_runtime::events::SyncTrigger;
use core_sync::{SyncCoordinator, SyncError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Background task that triggers a sync every `period`.
///
/// The first sync happens one full period after start. Each tick reads the
/// current settings, so edits take effect without a restart. A tick that
/// lands while another run is in flight is skipped.
pub(crate) struct Scheduler {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub(crate) fn start(
        coordinator: Arc<SyncCoordinator>,
        settings: Arc<RwLock<Settings>>,
        period: Duration,
    ) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "Sync timer started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let snapshot = settings.read().await.clone();
                        match coordinator.sync(&snapshot, SyncTrigger::Timer).await {
                            Ok(report) => debug!(run_id = %report.run_id, "Timer sync dispatched"),
                            Err(SyncError::SyncInProgress) => debug!("Timer tick skipped, sync in progress"),
                            Err(e) => warn!(error = %e, "Timer sync failed"),
                        }
                    }
                    _ = task_token.cancelled() => {
                        info!("Sync timer shutting down");
                        break;
                    }
                }
            }
        });

        Self { token, handle }
    }

    /// Signal the timer to stop without waiting for it.
    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel the timer and wait for its task to end.
    pub(crate) async fn stop(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Sync timer task ended abnormally");
        }
    }
}
