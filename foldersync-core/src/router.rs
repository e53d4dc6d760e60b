//! Event router: filters raw change events and feeds the work queue.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::observer::SyncObserver;
use crate::queue::{Offer, QueueProducer};
use crate::registry::FolderRegistry;
use crate::source::{ChangeEvent, EventStreams};

/// Spawn the router loop. It exits only when `cancel` fires; a closed event
/// stream parks it until then.
pub(crate) fn spawn_router<O: SyncObserver + 'static>(
    registry: FolderRegistry,
    streams: EventStreams,
    producer: QueueProducer,
    observer: Arc<O>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let EventStreams {
            mut events,
            mut errors,
        } = streams;
        // With both streams closed only the cancellation branch stays armed.
        let mut events_open = true;
        let mut errors_open = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                error = errors.recv(), if errors_open => match error {
                    Some(error) => {
                        warn!(
                            target: "foldersync::router",
                            error = %error,
                            "event source reported an error"
                        );
                        observer.on_transport_error(&error);
                    }
                    None => errors_open = false,
                },
                event = events.recv(), if events_open => match event {
                    Some(event) => {
                        route_event(
                            &registry,
                            &producer,
                            observer.as_ref(),
                            &cancel,
                            event,
                        )
                        .await;
                    }
                    None => {
                        debug!(target: "foldersync::router", "event stream closed");
                        events_open = false;
                    }
                },
            }
        }

        info!(target: "foldersync::router", "router stopped");
    })
}

async fn route_event<O: SyncObserver>(
    registry: &FolderRegistry,
    producer: &QueueProducer,
    observer: &O,
    cancel: &CancellationToken,
    event: ChangeEvent,
) {
    let ChangeEvent { path, kind } = event;
    if !kind.is_dispatchable() {
        trace!(
            target: "foldersync::router",
            path = %path.display(),
            ?kind,
            "ignoring event kind"
        );
        return;
    }

    if registry.resolve(&path).await.is_none() {
        trace!(
            target: "foldersync::router",
            path = %path.display(),
            "no folder claims path"
        );
        observer.on_unmatched(&path);
        return;
    }

    if !is_regular_file(&path).await {
        trace!(
            target: "foldersync::router",
            path = %path.display(),
            "not a regular file"
        );
        return;
    }

    match producer.offer(path.clone(), cancel).await {
        Offer::Enqueued => {
            trace!(target: "foldersync::router", path = %path.display(), "queued");
            observer.on_enqueued(&path);
        }
        Offer::Dropped => {
            warn!(
                target: "foldersync::router",
                path = %path.display(),
                "work queue full; dropping file event"
            );
            observer.on_dropped(&path);
        }
        Offer::Closed => {
            debug!(
                target: "foldersync::router",
                path = %path.display(),
                "work queue closed"
            );
        }
        Offer::Cancelled => {}
    }
}

async fn is_regular_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}
