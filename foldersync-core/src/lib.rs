//! # foldersync-core
//!
//! Watches a set of directories and hands every new or rewritten file whose
//! name matches the folder's glob to a registered [`FileHandler`], exactly
//! once per admitted event.
//!
//! ## Architecture
//!
//! ```text
//! EventSource --> router --(bounded queue)--> worker(s) --> FileHandler
//!                   |                            |
//!                   +------ FolderRegistry ------+
//! ```
//!
//! - [`source`]: OS watcher adapter (`notify`) and an in-process channel source
//! - [`registry`]: path -> pattern/handler map shared behind one lock
//! - [`queue`]: fixed-capacity FIFO, drop-newest by default
//! - [`FolderSync`]: start/stop lifecycle and the registration API
//! - [`handler`]: handler trait and the JSON reference handler
//! - [`observer`]: hooks and counters for drops, misses and failures
//!
//! The handler for a file is resolved again at dispatch time, so a folder
//! re-registered while an event is queued uses the new registration.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod handler;
pub mod observer;
pub mod pattern;
pub mod queue;
pub mod registry;
pub mod source;

mod router;
mod sync;
mod worker;

#[cfg(test)]
mod test_support;

pub use config::{MAX_CAPACITY, OverflowPolicy, SyncConfig};
pub use error::{Result, SyncError};
pub use handler::{FileHandler, HandlerError, JsonDocument, JsonFileHandler};
pub use observer::{
    NoopSyncObserver, SyncObserver, SyncStats, SyncStatsSnapshot,
};
pub use pattern::{FilePattern, matches};
pub use registry::{FolderConfig, FolderRegistry, FolderSummary};
pub use source::{
    ChangeEvent, ChangeKind, ChannelEventSource, ChannelInjector, EventSource,
    EventStreams, NotifyEventSource, SourceOptions,
};
pub use sync::{FolderSync, RunState};
