//! Event source adapters.
//!
//! An [`EventSource`] wraps whatever primitive reports file changes (inotify,
//! FSEvents, ReadDirectoryChangesW through `notify`, or an in-process channel)
//! and exposes two streams: change notifications and asynchronous transport
//! errors. The lifecycle controller opens a source on start, arms one watch
//! per registered folder and closes it on stop; a closed source can be opened
//! again.
//!
//! Both streams are bounded. When the change buffer is full the producer
//! either waits for the router ([`OverflowPolicy::Block`]) or drops the change
//! and reports the drop on the error stream ([`OverflowPolicy::DropNewest`]).

use std::path::{Path, PathBuf};

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::{MAX_CAPACITY, OverflowPolicy};
use crate::error::Result;

pub mod channel;
pub mod native;

pub use channel::{ChannelEventSource, ChannelInjector};
pub use native::NotifyEventSource;

/// Operation reported for a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The path appeared, including files moved into a watched folder.
    Create,
    /// File contents changed.
    Write,
    Remove,
    /// The path was moved away.
    Rename,
    Metadata,
    Other,
}

impl ChangeKind {
    /// Only creations and content writes are routed to handlers.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, ChangeKind::Create | ChangeKind::Write)
    }
}

/// A single change notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Receiving halves handed to the router when a source is opened.
#[derive(Debug)]
pub struct EventStreams {
    pub events: mpsc::Receiver<ChangeEvent>,
    pub errors: mpsc::Receiver<String>,
}

/// Options applied when a source is opened.
#[derive(Clone, Copy, Debug)]
pub struct SourceOptions {
    pub recursive: bool,
    /// Capacity of each stream, clamped to `1..=MAX_CAPACITY`.
    pub buffer: usize,
    /// What a producer does when the change buffer is full.
    pub overflow: OverflowPolicy,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            buffer: 1024,
            overflow: OverflowPolicy::DropNewest,
        }
    }
}

/// Outcome of handing a change to the router.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Delivery {
    Buffered,
    /// The buffer was full; the drop was reported on the error stream.
    Dropped,
    /// The router is gone or the source was closed.
    Closed,
}

/// Sending halves shared by the adapters.
#[derive(Clone, Debug)]
pub(crate) struct StreamSenders {
    events: mpsc::Sender<ChangeEvent>,
    errors: mpsc::Sender<String>,
    overflow: OverflowPolicy,
}

pub(crate) fn bounded_streams(options: &SourceOptions) -> (StreamSenders, EventStreams) {
    let capacity = options.buffer.clamp(1, MAX_CAPACITY);
    let (events_tx, events) = mpsc::channel(capacity);
    let (errors_tx, errors) = mpsc::channel(capacity);
    (
        StreamSenders {
            events: events_tx,
            errors: errors_tx,
            overflow: options.overflow,
        },
        EventStreams { events, errors },
    )
}

impl StreamSenders {
    /// Never waits: a full buffer drops `event`.
    pub(crate) fn try_deliver(&self, event: ChangeEvent) -> Delivery {
        match self.events.try_send(event) {
            Ok(()) => Delivery::Buffered,
            Err(TrySendError::Full(event)) => {
                self.report(format!(
                    "event buffer full; dropped {:?} for {}",
                    event.kind,
                    event.path.display()
                ));
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Deliver under the overflow policy. With [`OverflowPolicy::Block`] this
    /// waits for buffer space until `closed` fires.
    pub(crate) async fn deliver(
        &self,
        event: ChangeEvent,
        closed: &CancellationToken,
    ) -> Delivery {
        match self.overflow {
            OverflowPolicy::DropNewest => self.try_deliver(event),
            OverflowPolicy::Block => {
                tokio::select! {
                    biased;
                    _ = closed.cancelled() => Delivery::Closed,
                    sent = self.events.send(event) => match sent {
                        Ok(()) => Delivery::Buffered,
                        Err(_) => Delivery::Closed,
                    },
                }
            }
        }
    }

    /// Queue a transport error. Errors that do not fit are discarded.
    pub(crate) fn report(&self, error: String) -> bool {
        match self.errors.try_send(error) {
            Ok(()) => true,
            Err(TrySendError::Full(error)) => {
                debug!(target: "foldersync::source", %error, "error stream full");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

pub trait EventSource: Send + 'static {
    /// Acquire OS resources and return fresh bounded streams. Opening an
    /// already open source replaces the previous streams.
    fn open(&mut self, options: SourceOptions) -> Result<EventStreams>;

    /// Begin watching `path`. Fails with
    /// [`SyncError::WatchAttach`](crate::SyncError::WatchAttach) when the
    /// watch cannot be established and with
    /// [`SyncError::SourceOpen`](crate::SyncError::SourceOpen) when the
    /// source is not open.
    fn watch(&mut self, path: &Path) -> Result<()>;

    /// Release every watch and the underlying resources. A producer waiting
    /// for buffer space gives up. Both streams end once pending items are
    /// drained.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}
