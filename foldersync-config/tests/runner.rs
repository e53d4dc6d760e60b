use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use foldersync_config::{AppConfig, FolderSpec, HandlerSpec, run_with};
use foldersync_core::{
    ChangeEvent, ChangeKind, ChannelEventSource, FolderSync, SyncConfig,
    SyncStats,
};
use tempfile::tempdir;
use tokio::sync::oneshot;

fn spec(path: PathBuf, pattern: &str, handler: HandlerSpec) -> FolderSpec {
    FolderSpec {
        path,
        pattern: pattern.to_string(),
        handler,
    }
}

#[tokio::test]
async fn runs_until_shutdown_and_reports_stats() {
    let tmp = tempdir().unwrap();
    let config = AppConfig {
        sync: SyncConfig {
            settle_delay_ms: 0,
            ..SyncConfig::default()
        },
        folders: vec![
            spec(
                tmp.path().join("orders"),
                "*.json",
                HandlerSpec::Json {
                    settle_delay_ms: None,
                },
            ),
            spec(tmp.path().join("raw"), "*", HandlerSpec::Log),
        ],
    };

    let (source, injector) = ChannelEventSource::new();
    let stats = Arc::new(SyncStats::new());
    let sync = FolderSync::with_parts(config.sync.clone(), source, stats.clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let run = tokio::spawn(async move {
        run_with(sync, &config, async {
            let _ = stop_rx.await;
        })
        .await
    });

    // Folders are created and watched once the runner has started.
    for _ in 0..500 {
        if injector.watched().len() == 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let watched = injector.watched();
    assert_eq!(watched.len(), 2);

    let orders = std::fs::canonicalize(tmp.path().join("orders")).unwrap();
    let raw = std::fs::canonicalize(tmp.path().join("raw")).unwrap();
    let good = orders.join("a.json");
    let bad = orders.join("b.json");
    let blob = raw.join("blob.bin");
    std::fs::write(&good, br#"{"id": 1}"#).unwrap();
    std::fs::write(&bad, b"not json").unwrap();
    std::fs::write(&blob, b"bytes").unwrap();

    for path in [&good, &bad, &blob] {
        injector.emit(ChangeEvent::new(path, ChangeKind::Create));
    }
    for _ in 0..500 {
        let snapshot = stats.snapshot();
        if snapshot.dispatched + snapshot.failed == 3 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    stop_tx.send(()).unwrap();
    let snapshot = run.await.unwrap().unwrap();
    assert_eq!(snapshot.dispatched, 2);
    assert_eq!(snapshot.failed, 1);
    assert!(!injector.is_open());
}

#[tokio::test]
async fn unusable_folder_aborts_before_start() {
    let tmp = tempdir().unwrap();
    let occupied = tmp.path().join("occupied");
    std::fs::write(&occupied, b"file").unwrap();

    let config = AppConfig {
        sync: SyncConfig::default(),
        folders: vec![spec(occupied, "*", HandlerSpec::Log)],
    };
    let (source, injector) = ChannelEventSource::new();
    let stats = Arc::new(SyncStats::new());
    let sync = FolderSync::with_parts(config.sync.clone(), source, stats);

    let err = run_with(sync, &config, async {}).await.unwrap_err();
    assert!(err.to_string().contains("failed to register"));
    assert_eq!(injector.open_count(), 0);
}
