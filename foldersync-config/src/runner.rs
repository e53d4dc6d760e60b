//! Wires a loaded [`AppConfig`] into a running [`FolderSync`].

use std::future::Future;

use anyhow::Context;
use foldersync_core::{
    EventSource, FolderSync, SyncObserver, SyncStats, SyncStatsSnapshot,
};
use tracing::{info, warn};

use crate::handlers::build_handler;
use crate::models::AppConfig;

/// Register every configured folder. Stops at the first folder whose
/// directory cannot be prepared or watched.
pub async fn register_folders<S, O>(
    sync: &FolderSync<S, O>,
    config: &AppConfig,
) -> anyhow::Result<()>
where
    S: EventSource,
    O: SyncObserver + 'static,
{
    for folder in &config.folders {
        let handler = build_handler(&folder.handler, &config.sync);
        let dir = sync
            .add_folder(&folder.path, &folder.pattern, handler)
            .await
            .with_context(|| format!("failed to register {}", folder.path.display()))?;
        info!(
            target: "foldersync::runner",
            folder = %dir.display(),
            pattern = %folder.pattern,
            handler = folder.handler.kind(),
            "folder configured"
        );
    }
    Ok(())
}

/// Register folders, start, wait for `shutdown`, then stop and drain the
/// background tasks. Returns the final counters.
pub async fn run_with<S, F>(
    sync: FolderSync<S, SyncStats>,
    config: &AppConfig,
    shutdown: F,
) -> anyhow::Result<SyncStatsSnapshot>
where
    S: EventSource,
    F: Future<Output = ()>,
{
    register_folders(&sync, config).await?;
    sync.start().await.context("failed to start synchronizer")?;

    let watched = sync.watched().await;
    if watched.len() < config.folders.len() {
        warn!(
            target: "foldersync::runner",
            watched = watched.len(),
            configured = config.folders.len(),
            "some folders could not be watched"
        );
    }
    info!(
        target: "foldersync::runner",
        folders = watched.len(),
        "synchronizer running"
    );

    shutdown.await;

    info!(target: "foldersync::runner", "shutdown requested");
    sync.shutdown().await.context("failed to stop synchronizer")?;
    Ok(sync.stats())
}

/// [`run_with`] on the native OS watcher.
pub async fn run<F>(config: &AppConfig, shutdown: F) -> anyhow::Result<SyncStatsSnapshot>
where
    F: Future<Output = ()>,
{
    let sync = FolderSync::with_stats(config.sync.clone());
    run_with(sync, config, shutdown).await
}
