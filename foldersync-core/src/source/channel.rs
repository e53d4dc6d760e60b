use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::{
    ChangeEvent, Delivery, EventSource, EventStreams, SourceOptions, StreamSenders,
    bounded_streams,
};
use crate::error::{Result, SyncError};

/// In-process event source fed through a [`ChannelInjector`].
///
/// Useful for embedding a producer that is not an OS watcher (a poller, an
/// upload endpoint) and for driving the pipeline deterministically.
pub struct ChannelEventSource {
    shared: Arc<Mutex<Shared>>,
}

/// Producer half of a [`ChannelEventSource`].
#[derive(Clone)]
pub struct ChannelInjector {
    shared: Arc<Mutex<Shared>>,
}

#[derive(Default)]
struct Shared {
    senders: Option<StreamSenders>,
    closed: CancellationToken,
    watched: Vec<PathBuf>,
    rejected: HashSet<PathBuf>,
    open_count: usize,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChannelEventSource {
    pub fn new() -> (Self, ChannelInjector) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            ChannelInjector { shared },
        )
    }
}

impl fmt::Debug for ChannelEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = lock(&self.shared);
        f.debug_struct("ChannelEventSource")
            .field("open", &guard.senders.is_some())
            .field("watched", &guard.watched)
            .finish()
    }
}

impl fmt::Debug for ChannelInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelInjector")
            .field("open_count", &self.open_count())
            .finish_non_exhaustive()
    }
}

impl EventSource for ChannelEventSource {
    fn open(&mut self, options: SourceOptions) -> Result<EventStreams> {
        let (senders, streams) = bounded_streams(&options);

        let mut guard = lock(&self.shared);
        guard.closed.cancel();
        guard.closed = CancellationToken::new();
        guard.senders = Some(senders);
        guard.watched.clear();
        guard.open_count += 1;

        Ok(streams)
    }

    fn watch(&mut self, path: &Path) -> Result<()> {
        let mut guard = lock(&self.shared);
        if guard.senders.is_none() {
            return Err(SyncError::SourceOpen("channel source is not open".into()));
        }
        if guard.rejected.contains(path) {
            return Err(SyncError::WatchAttach {
                path: path.to_path_buf(),
                reason: "permission denied".into(),
            });
        }
        if !path.is_dir() {
            return Err(SyncError::WatchAttach {
                path: path.to_path_buf(),
                reason: "not a directory".into(),
            });
        }

        guard.watched.push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        let mut guard = lock(&self.shared);
        guard.closed.cancel();
        guard.senders = None;
        guard.watched.clear();
    }

    fn is_open(&self) -> bool {
        lock(&self.shared).senders.is_some()
    }
}

impl ChannelInjector {
    /// Deliver a change without waiting. Returns false when the source is
    /// closed or its buffer is full; a full buffer reports the drop on the
    /// error stream.
    pub fn emit(&self, event: ChangeEvent) -> bool {
        lock(&self.shared)
            .senders
            .as_ref()
            .is_some_and(|senders| senders.try_deliver(event) == Delivery::Buffered)
    }

    /// Deliver a change under the overflow policy the source was opened
    /// with. With the blocking policy this waits for buffer space, giving up
    /// when the source closes.
    pub async fn send(&self, event: ChangeEvent) -> bool {
        let (senders, closed) = {
            let guard = lock(&self.shared);
            match &guard.senders {
                Some(senders) => (senders.clone(), guard.closed.clone()),
                None => return false,
            }
        };
        senders.deliver(event, &closed).await == Delivery::Buffered
    }

    /// Deliver a transport error. Returns false when the source is closed.
    pub fn emit_error(&self, error: impl Into<String>) -> bool {
        lock(&self.shared)
            .senders
            .as_ref()
            .is_some_and(|senders| senders.report(error.into()))
    }

    /// Make every future watch of `path` fail.
    pub fn reject(&self, path: impl Into<PathBuf>) {
        lock(&self.shared).rejected.insert(path.into());
    }

    /// Watches armed since the last open, in arming order.
    pub fn watched(&self) -> Vec<PathBuf> {
        lock(&self.shared).watched.clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.shared).open_count
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared).senders.is_some()
    }
}
