//! Observer hooks for routing and dispatch outcomes.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::handler::HandlerError;

/// Receives a callback for every routing and dispatch outcome. All methods
/// default to no-ops so implementors only override what they track.
pub trait SyncObserver: Send + Sync {
    fn on_enqueued(&self, _path: &Path) {}

    /// The queue was full and the path was discarded.
    fn on_dropped(&self, _path: &Path) {}

    /// No registered folder claimed the path, either at routing or at dispatch.
    fn on_unmatched(&self, _path: &Path) {}

    fn on_dispatched(&self, _path: &Path) {}

    fn on_handler_failed(&self, _path: &Path, _error: &HandlerError) {}

    fn on_transport_error(&self, _error: &str) {}
}

/// No-op observer used when metrics instrumentation is not wired up.
pub struct NoopSyncObserver;

impl SyncObserver for NoopSyncObserver {}

impl fmt::Debug for NoopSyncObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NoopSyncObserver")
    }
}

/// Counting observer.
#[derive(Debug, Default)]
pub struct SyncStats {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    unmatched: AtomicU64,
    dispatched: AtomicU64,
    failed: AtomicU64,
    transport_errors: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStatsSnapshot {
    pub enqueued: u64,
    pub dropped: u64,
    pub unmatched: u64,
    /// Handler invocations that returned success.
    pub dispatched: u64,
    pub failed: u64,
    pub transport_errors: u64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            unmatched: self.unmatched.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
        }
    }
}

impl SyncObserver for SyncStats {
    fn on_enqueued(&self, _path: &Path) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    fn on_dropped(&self, _path: &Path) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn on_unmatched(&self, _path: &Path) {
        self.unmatched.fetch_add(1, Ordering::Relaxed);
    }

    fn on_dispatched(&self, _path: &Path) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    fn on_handler_failed(&self, _path: &Path, _error: &HandlerError) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn on_transport_error(&self, _error: &str) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }
}
