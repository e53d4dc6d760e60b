//! Lifecycle controller and public registration API.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::handler::FileHandler;
use crate::observer::{NoopSyncObserver, SyncObserver, SyncStats, SyncStatsSnapshot};
use crate::pattern::FilePattern;
use crate::queue::work_queue;
use crate::registry::{FolderConfig, FolderRegistry, FolderSummary, prepare_directory};
use crate::router::spawn_router;
use crate::source::{EventSource, NotifyEventSource, SourceOptions};
use crate::worker::spawn_worker;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Stopped,
    Running,
}

/// Watches registered folders and dispatches matching files to their
/// handlers through a bounded queue.
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use foldersync_core::{FolderSync, JsonFileHandler, SyncConfig};
///
/// # async fn run() -> foldersync_core::Result<()> {
/// let sync = FolderSync::new(SyncConfig::default());
/// let handler = JsonFileHandler::new(Duration::from_millis(500), |path, doc| {
///     println!("{}: {:?}", path.display(), doc);
///     Ok(())
/// });
/// sync.add_folder("/data/in", "*.json", Arc::new(handler)).await?;
/// sync.start().await?;
/// # sync.stop().await
/// # }
/// ```
pub struct FolderSync<
    S: EventSource = NotifyEventSource,
    O: SyncObserver = NoopSyncObserver,
> {
    config: SyncConfig,
    registry: FolderRegistry,
    observer: Arc<O>,
    lifecycle: Mutex<Lifecycle<S>>,
}

struct Lifecycle<S> {
    state: RunState,
    source: S,
    /// Replaced, never reset, on every stop.
    cancel: CancellationToken,
    watched: HashSet<PathBuf>,
    tasks: Vec<JoinHandle<()>>,
}

impl FolderSync {
    /// Synchronizer backed by the native OS watcher.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_parts(config, NotifyEventSource::new(), Arc::new(NoopSyncObserver))
    }
}

impl FolderSync<NotifyEventSource, SyncStats> {
    /// Native watcher with counting statistics.
    pub fn with_stats(config: SyncConfig) -> Self {
        Self::with_parts(config, NotifyEventSource::new(), Arc::new(SyncStats::new()))
    }
}

impl<S: EventSource> FolderSync<S, SyncStats> {
    pub fn stats(&self) -> SyncStatsSnapshot {
        self.observer.snapshot()
    }
}

impl<S: EventSource, O: SyncObserver + 'static> fmt::Debug for FolderSync<S, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FolderSync");
        debug
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("source_type", &std::any::type_name::<S>())
            .field("observer_type", &std::any::type_name::<O>());

        match self.lifecycle.try_lock() {
            Ok(guard) => {
                debug
                    .field("state", &guard.state)
                    .field("watched", &guard.watched.len())
                    .field("tasks", &guard.tasks.len());
            }
            Err(_) => {
                debug.field("lifecycle", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl<S: EventSource, O: SyncObserver + 'static> FolderSync<S, O> {
    pub fn with_parts(config: SyncConfig, source: S, observer: Arc<O>) -> Self {
        Self {
            config,
            registry: FolderRegistry::new(),
            observer,
            lifecycle: Mutex::new(Lifecycle {
                state: RunState::Stopped,
                source,
                cancel: CancellationToken::new(),
                watched: HashSet::new(),
                tasks: Vec::new(),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn observer(&self) -> &Arc<O> {
        &self.observer
    }

    /// Register `path` (created if missing) so files whose base name matches
    /// `pattern` are handed to `handler`. Re-registering a path replaces its
    /// pattern and handler. While running, the folder is watched immediately.
    ///
    /// Returns the canonical directory path used as the registry key. On a
    /// watch failure the folder stays registered and is retried on the next
    /// start or re-registration.
    pub async fn add_folder(
        &self,
        path: impl AsRef<Path>,
        pattern: &str,
        handler: Arc<dyn FileHandler>,
    ) -> Result<PathBuf> {
        let dir = prepare_directory(path.as_ref()).await?;
        let folder = FolderConfig {
            path: dir.clone(),
            pattern: FilePattern::new(pattern),
            handler,
        };

        let mut lifecycle = self.lifecycle.lock().await;
        if self.registry.insert(folder).await.is_some() {
            info!(
                target: "foldersync::lifecycle",
                folder = %dir.display(),
                pattern,
                "replaced folder registration"
            );
        } else {
            info!(
                target: "foldersync::lifecycle",
                folder = %dir.display(),
                pattern,
                "registered folder"
            );
        }

        if lifecycle.state == RunState::Running && !lifecycle.watched.contains(&dir) {
            lifecycle.source.watch(&dir)?;
            lifecycle.watched.insert(dir.clone());
            debug!(
                target: "foldersync::lifecycle",
                folder = %dir.display(),
                "watching folder"
            );
        }

        Ok(dir)
    }

    /// Open the event source, watch every registered folder and launch the
    /// router and workers. No-op when already running.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == RunState::Running {
            debug!(target: "foldersync::lifecycle", "start ignored; already running");
            return Ok(());
        }

        let streams = lifecycle.source.open(SourceOptions {
            recursive: self.config.recursive,
            buffer: self.config.event_buffer(),
            overflow: self.config.overflow,
        })?;
        lifecycle.state = RunState::Running;

        lifecycle.watched.clear();
        for path in self.registry.paths().await {
            match lifecycle.source.watch(&path) {
                Ok(()) => {
                    lifecycle.watched.insert(path);
                }
                Err(err) => {
                    warn!(
                        target: "foldersync::lifecycle",
                        folder = %path.display(),
                        error = %err,
                        "failed to watch folder"
                    );
                }
            }
        }

        let cancel = lifecycle.cancel.clone();
        let (producer, consumer) =
            work_queue(self.config.queue_capacity(), self.config.overflow);

        let mut tasks = Vec::with_capacity(self.config.workers() + 1);
        tasks.push(spawn_router(
            self.registry.clone(),
            streams,
            producer,
            Arc::clone(&self.observer),
            cancel.clone(),
        ));
        for worker_id in 0..self.config.workers() {
            tasks.push(spawn_worker(
                worker_id,
                self.registry.clone(),
                consumer.clone(),
                Arc::clone(&self.observer),
                cancel.clone(),
            ));
        }
        lifecycle.tasks = tasks;

        info!(
            target: "foldersync::lifecycle",
            folders = lifecycle.watched.len(),
            workers = self.config.workers(),
            queue_capacity = self.config.queue_capacity(),
            "folder sync started"
        );
        Ok(())
    }

    /// Cancel the router and workers and release the event source. Handlers
    /// already running finish on their own; nothing new is dispatched. No-op
    /// when already stopped.
    pub async fn stop(&self) -> Result<()> {
        drop(self.halt().await);
        Ok(())
    }

    /// Like [`stop`](Self::stop), but also waits for the router and workers
    /// to exit, including any handler that was mid-flight.
    pub async fn shutdown(&self) -> Result<()> {
        for task in self.halt().await {
            if let Err(err) = task.await {
                warn!(
                    target: "foldersync::lifecycle",
                    error = %err,
                    "task ended abnormally"
                );
            }
        }
        Ok(())
    }

    async fn halt(&self) -> Vec<JoinHandle<()>> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == RunState::Stopped {
            debug!(target: "foldersync::lifecycle", "stop ignored; already stopped");
            return Vec::new();
        }

        lifecycle.state = RunState::Stopped;
        lifecycle.cancel.cancel();
        lifecycle.cancel = CancellationToken::new();
        lifecycle.source.close();
        lifecycle.watched.clear();

        info!(target: "foldersync::lifecycle", "folder sync stopped");
        std::mem::take(&mut lifecycle.tasks)
    }

    pub async fn state(&self) -> RunState {
        self.lifecycle.lock().await.state
    }

    pub async fn is_running(&self) -> bool {
        self.state().await == RunState::Running
    }

    pub async fn folders(&self) -> Vec<FolderSummary> {
        self.registry.summaries().await
    }

    /// Folders currently armed on the event source.
    pub async fn watched(&self) -> Vec<PathBuf> {
        let mut watched: Vec<_> =
            self.lifecycle.lock().await.watched.iter().cloned().collect();
        watched.sort();
        watched
    }
}

impl<S: EventSource, O: SyncObserver> Drop for FolderSync<S, O> {
    fn drop(&mut self) {
        self.lifecycle.get_mut().cancel.cancel();
    }
}
