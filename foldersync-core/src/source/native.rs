use std::fmt;
use std::path::Path;

use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    ChangeEvent, ChangeKind, Delivery, EventSource, EventStreams, SourceOptions,
    bounded_streams,
};
use crate::error::{Result, SyncError};

/// Native OS watcher backed by `notify::RecommendedWatcher`.
pub struct NotifyEventSource {
    watcher: Option<RecommendedWatcher>,
    mode: RecursiveMode,
    /// Fired on close so a callback waiting for buffer space lets go.
    closed: CancellationToken,
}

impl Default for NotifyEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyEventSource {
    pub fn new() -> Self {
        Self {
            watcher: None,
            mode: RecursiveMode::NonRecursive,
            closed: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for NotifyEventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyEventSource")
            .field("open", &self.watcher.is_some())
            .field("mode", &self.mode)
            .finish()
    }
}

impl EventSource for NotifyEventSource {
    fn open(&mut self, options: SourceOptions) -> Result<EventStreams> {
        let (senders, streams) = bounded_streams(&options);

        self.closed.cancel();
        self.closed = CancellationToken::new();
        let closed = self.closed.clone();

        // Runs on notify's own thread, outside the tokio runtime, so it may
        // block while the router catches up.
        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for change in translate(event) {
                        let delivery =
                            futures::executor::block_on(senders.deliver(change, &closed));
                        if delivery == Delivery::Closed {
                            debug!(target: "foldersync::source", "event stream closed");
                            return;
                        }
                    }
                }
                Err(err) => {
                    senders.report(err.to_string());
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|err| {
            SyncError::SourceOpen(format!("failed to create watcher: {err}"))
        })?;

        self.mode = if options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        self.watcher = Some(watcher);

        Ok(streams)
    }

    fn watch(&mut self, path: &Path) -> Result<()> {
        let mode = self.mode;
        let watcher = self
            .watcher
            .as_mut()
            .ok_or_else(|| SyncError::SourceOpen("watcher is not open".into()))?;

        watcher
            .watch(path, mode)
            .map_err(|err| SyncError::WatchAttach {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })
    }

    fn close(&mut self) {
        self.closed.cancel();
        // Dropping the watcher stops the notify thread and closes both senders.
        if self.watcher.take().is_none() {
            warn!(
                target: "foldersync::source",
                "close called on a source that was not open"
            );
        }
    }

    fn is_open(&self) -> bool {
        self.watcher.is_some()
    }
}

fn translate(event: Event) -> Vec<ChangeEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Create,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => ChangeKind::Write,
        EventKind::Modify(ModifyKind::Metadata(_)) => ChangeKind::Metadata,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Create,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            let mut paths = event.paths.into_iter();
            let mut out = Vec::with_capacity(2);
            if let Some(from) = paths.next() {
                out.push(ChangeEvent::new(from, ChangeKind::Rename));
            }
            if let Some(to) = paths.next() {
                out.push(ChangeEvent::new(to, ChangeKind::Create));
            }
            return out;
        }
        EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Rename,
        EventKind::Remove(_) => ChangeKind::Remove,
        EventKind::Modify(ModifyKind::Other)
        | EventKind::Access(_)
        | EventKind::Any
        | EventKind::Other => ChangeKind::Other,
    };

    event
        .paths
        .into_iter()
        .map(|path| ChangeEvent::new(path, kind))
        .collect()
}
