//! Dispatch workers: drain the queue and run handlers one file at a time.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handler::HandlerError;
use crate::observer::SyncObserver;
use crate::queue::QueueConsumer;
use crate::registry::FolderRegistry;

pub(crate) fn spawn_worker<O: SyncObserver + 'static>(
    worker_id: usize,
    registry: FolderRegistry,
    queue: QueueConsumer,
    observer: Arc<O>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(path) = queue.next(&cancel).await {
            dispatch(worker_id, &registry, observer.as_ref(), &path).await;
        }
        info!(target: "foldersync::worker", worker_id, "worker stopped");
    })
}

/// Resolve the folder that owns `path` as the registry stands now and run its
/// handler. Failures and panics are reported, never propagated.
pub(crate) async fn dispatch<O: SyncObserver>(
    worker_id: usize,
    registry: &FolderRegistry,
    observer: &O,
    path: &Path,
) {
    let Some(folder) = registry.resolve(path).await else {
        warn!(
            target: "foldersync::worker",
            worker_id,
            path = %path.display(),
            "no handler for file"
        );
        observer.on_unmatched(path);
        return;
    };

    let handler = folder.handler;
    let outcome = AssertUnwindSafe(handler.process_file(path))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(())) => {
            debug!(
                target: "foldersync::worker",
                worker_id,
                handler = handler.name(),
                path = %path.display(),
                "file processed"
            );
            observer.on_dispatched(path);
        }
        Ok(Err(err)) => {
            warn!(
                target: "foldersync::worker",
                worker_id,
                handler = handler.name(),
                path = %path.display(),
                error = %err,
                "handler failed"
            );
            observer.on_handler_failed(path, &err);
        }
        Err(panic) => {
            let err = HandlerError::Panicked(panic_message(panic.as_ref()));
            error!(
                target: "foldersync::worker",
                worker_id,
                handler = handler.name(),
                path = %path.display(),
                error = %err,
                "handler panicked"
            );
            observer.on_handler_failed(path, &err);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::OverflowPolicy;
    use crate::handler::FileHandler;
    use crate::observer::SyncStats;
    use crate::pattern::FilePattern;
    use crate::queue::work_queue;
    use crate::registry::FolderConfig;
    use crate::test_support::{RecordingHandler, wait_until};

    struct Failing;

    #[async_trait]
    impl FileHandler for Failing {
        async fn process_file(&self, path: &Path) -> Result<(), HandlerError> {
            Err(HandlerError::Rejected(format!("cannot take {}", path.display())))
        }
    }

    struct Panicking;

    #[async_trait]
    impl FileHandler for Panicking {
        async fn process_file(&self, _path: &Path) -> Result<(), HandlerError> {
            panic!("handler exploded");
        }
    }

    async fn registry_with(
        pattern: &str,
        handler: Arc<dyn FileHandler>,
    ) -> FolderRegistry {
        let registry = FolderRegistry::new();
        registry
            .insert(FolderConfig {
                path: PathBuf::from("/data/in"),
                pattern: FilePattern::new(pattern),
                handler,
            })
            .await;
        registry
    }

    #[tokio::test]
    async fn runs_resolved_handler_in_fifo_order() {
        let handler = Arc::new(RecordingHandler::default());
        let registry = registry_with("*.json", handler.clone()).await;
        let stats = Arc::new(SyncStats::new());
        let (producer, consumer) = work_queue(8, OverflowPolicy::DropNewest);
        let cancel = CancellationToken::new();

        for name in ["a.json", "b.json", "c.json"] {
            producer.try_offer(PathBuf::from("/data/in").join(name));
        }
        let task = spawn_worker(0, registry, consumer, stats.clone(), cancel.clone());

        assert!(wait_until(|| stats.snapshot().dispatched == 3).await);
        assert_eq!(
            handler.seen(),
            vec![
                PathBuf::from("/data/in/a.json"),
                PathBuf::from("/data/in/b.json"),
                PathBuf::from("/data/in/c.json"),
            ]
        );

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failures_and_panics_are_contained() {
        let stats = SyncStats::new();

        let failing = registry_with("*.json", Arc::new(Failing)).await;
        dispatch(0, &failing, &stats, Path::new("/data/in/a.json")).await;

        let panicking = registry_with("*.json", Arc::new(Panicking)).await;
        dispatch(0, &panicking, &stats, Path::new("/data/in/b.json")).await;

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.failed, 2);
        assert_eq!(snapshot.dispatched, 0);
    }

    #[tokio::test]
    async fn worker_survives_handler_panic() {
        let registry = registry_with("*.json", Arc::new(Panicking)).await;
        let stats = Arc::new(SyncStats::new());
        let (producer, consumer) = work_queue(8, OverflowPolicy::DropNewest);
        let cancel = CancellationToken::new();
        let task =
            spawn_worker(0, registry.clone(), consumer, stats.clone(), cancel.clone());

        producer.try_offer("/data/in/a.json".into());
        assert!(wait_until(|| stats.snapshot().failed == 1).await);

        let recorder = Arc::new(RecordingHandler::default());
        registry
            .insert(FolderConfig {
                path: PathBuf::from("/data/in"),
                pattern: FilePattern::new("*.json"),
                handler: recorder.clone(),
            })
            .await;
        producer.try_offer("/data/in/b.json".into());
        assert!(wait_until(|| stats.snapshot().dispatched == 1).await);
        assert_eq!(recorder.seen(), vec![PathBuf::from("/data/in/b.json")]);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn handler_is_resolved_at_dispatch_time() {
        let first = Arc::new(RecordingHandler::default());
        let registry = registry_with("*.json", first.clone()).await;

        // Registry changes between enqueue and dispatch: pattern no longer matches.
        registry
            .insert(FolderConfig {
                path: PathBuf::from("/data/in"),
                pattern: FilePattern::new("*.csv"),
                handler: first.clone(),
            })
            .await;

        let stats = SyncStats::new();
        dispatch(0, &registry, &stats, Path::new("/data/in/a.json")).await;
        assert!(first.seen().is_empty());
        assert_eq!(stats.snapshot().unmatched, 1);
    }

    #[tokio::test]
    async fn exits_promptly_on_cancel() {
        let registry = FolderRegistry::new();
        let (_producer, consumer) = work_queue(1, OverflowPolicy::DropNewest);
        let cancel = CancellationToken::new();
        let task = spawn_worker(
            0,
            registry,
            consumer,
            Arc::new(SyncStats::new()),
            cancel.clone(),
        );

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("worker exits after cancel")
            .unwrap();
    }
}
