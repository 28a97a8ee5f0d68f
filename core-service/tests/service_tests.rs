use async_trait::async_trait;
use bridge_traits::{
    http::{HttpClient, HttpRequest, HttpResponse},
    FixedClock, MemoryStorage,
};
use chrono::NaiveDate;
use core_runtime::config::Settings;
use core_runtime::events::{CoreEvent, SyncEvent, SyncTrigger};
use core_service::{BookmarkSyncService, CoreDependencies, CoreError};
use mockall::mock;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> bridge_traits::error::Result<HttpResponse>;
    }
}

const XBEL: &str = r#"<xbel><title>Work</title><bookmark href="http://x.test"><title>Site</title></bookmark></xbel>"#;

fn deps(storage: Arc<MemoryStorage>) -> CoreDependencies {
    let mut http = MockHttpClient::new();
    http.expect_execute().never();
    let clock = FixedClock::new(
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 8, 9)
            .unwrap(),
    );
    CoreDependencies::new(storage, Arc::new(http), Arc::new(clock))
}

fn settings() -> Settings {
    Settings {
        xbel_folder_path: "exports".to_string(),
        md_folder_path: "notes".to_string(),
        backup_folder_path: "backup".to_string(),
        html2md_api: String::new(),
        ..Settings::default()
    }
}

fn storage() -> Arc<MemoryStorage> {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert("exports/bookmarks.xbel", XBEL);
    storage
}

fn started_trigger(event: &CoreEvent) -> Option<SyncTrigger> {
    match event {
        CoreEvent::Sync(SyncEvent::Started { trigger, .. }) => Some(*trigger),
        _ => None,
    }
}

#[tokio::test]
async fn test_new_uses_defaults_without_settings_file() {
    let service = BookmarkSyncService::new(deps(storage()), "config/settings.json")
        .await
        .unwrap();

    assert_eq!(service.settings().await, Settings::default());
    assert_eq!(service.settings_path(), Path::new("config/settings.json"));
}

#[tokio::test]
async fn test_new_loads_persisted_settings() {
    let storage = storage();
    storage.insert("settings.json", r#"{"mdFolderPath":"vault","keepCount":3}"#);

    let service = BookmarkSyncService::new(deps(storage), "settings.json")
        .await
        .unwrap();

    let loaded = service.settings().await;
    assert_eq!(loaded.md_folder_path, "vault");
    assert_eq!(loaded.keep_count, 3);
}

#[tokio::test]
async fn test_sync_now_writes_note() {
    let storage = storage();
    let service = BookmarkSyncService::with_settings(deps(storage.clone()), "settings.json", settings());

    let report = service.sync_now().await.unwrap();

    assert_eq!(report.bookmarks, 1);
    assert_eq!(
        storage.contents("notes/bookmarks.md").as_deref(),
        Some("# Work\n[Site](http://x.test)\n")
    );
}

#[tokio::test]
async fn test_update_settings_persists_and_syncs() {
    let storage = storage();
    let service = BookmarkSyncService::with_settings(deps(storage.clone()), "settings.json", settings());
    let mut events = service.subscribe_events();

    let updated = Settings {
        md_folder_path: "vault".to_string(),
        ..settings()
    };
    service.update_settings(updated.clone()).await.unwrap();

    assert_eq!(service.settings().await, updated);
    let persisted: Settings =
        serde_json::from_str(&storage.contents("settings.json").unwrap()).unwrap();
    assert_eq!(persisted, updated);
    assert!(storage.contents("vault/bookmarks.md").is_some());

    let first = events.recv().await.unwrap();
    assert_eq!(started_trigger(&first), Some(SyncTrigger::SettingsChanged));
}

#[tokio::test]
async fn test_update_settings_rejects_invalid_values() {
    let storage = storage();
    let service = BookmarkSyncService::with_settings(deps(storage.clone()), "settings.json", settings());

    let invalid = Settings {
        xbel_file_name: String::new(),
        ..settings()
    };
    let err = service.update_settings(invalid).await.unwrap_err();

    assert!(matches!(err, CoreError::Runtime(_)));
    assert!(storage.contents("settings.json").is_none());
    assert_eq!(service.settings().await, settings());
}

#[tokio::test]
async fn test_sync_error_is_surfaced() {
    let storage = Arc::new(MemoryStorage::new());
    let service = BookmarkSyncService::with_settings(deps(storage), "settings.json", settings());

    let err = service.sync_now().await.unwrap_err();
    assert!(matches!(err, CoreError::Sync(_)));
}

#[tokio::test(start_paused = true)]
async fn test_timer_runs_sync_every_period() {
    let timed = Settings {
        automatic_update: true,
        update_interval: 1,
        ..settings()
    };
    let service = BookmarkSyncService::with_settings(deps(storage()), "settings.json", timed);
    let mut started = service
        .subscribe_events()
        .filter(|event| started_trigger(event).is_some());

    service.start().await.unwrap();
    assert_eq!(
        started_trigger(&started.recv().await.unwrap()),
        Some(SyncTrigger::Startup)
    );

    tokio::time::sleep(Duration::from_secs(61)).await;
    assert_eq!(
        started_trigger(&started.recv().await.unwrap()),
        Some(SyncTrigger::Timer)
    );

    service.shutdown().await;
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(started.try_recv().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_timer_disabled_by_default() {
    let service = BookmarkSyncService::with_settings(deps(storage()), "settings.json", settings());
    let mut started = service
        .subscribe_events()
        .filter(|event| started_trigger(event).is_some());

    service.start().await.unwrap();
    started.recv().await.unwrap();

    tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
    assert!(started.try_recv().is_none());
}
