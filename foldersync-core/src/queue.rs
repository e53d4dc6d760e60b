//! Bounded FIFO of paths awaiting dispatch.
//!
//! The router is the only producer. Workers share the consumer; with a single
//! worker the inner lock is uncontended.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use crate::config::{MAX_CAPACITY, OverflowPolicy};

/// Result of offering a path to the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Offer {
    Enqueued,
    /// The queue was full and the path was discarded.
    Dropped,
    /// Every consumer is gone.
    Closed,
    /// Cancelled while waiting for space (blocking policy only).
    Cancelled,
}

/// Create a queue holding at most `capacity` pending paths, clamped to
/// `1..=MAX_CAPACITY`.
pub fn work_queue(
    capacity: usize,
    policy: OverflowPolicy,
) -> (QueueProducer, QueueConsumer) {
    let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_CAPACITY));
    (
        QueueProducer { tx, policy },
        QueueConsumer {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

pub struct QueueProducer {
    tx: mpsc::Sender<PathBuf>,
    policy: OverflowPolicy,
}

impl fmt::Debug for QueueProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProducer")
            .field("policy", &self.policy)
            .field("capacity", &self.tx.max_capacity())
            .field("available", &self.tx.capacity())
            .finish()
    }
}

impl QueueProducer {
    /// Never suspends: the path is either queued now or dropped.
    pub fn try_offer(&self, path: PathBuf) -> Offer {
        match self.tx.try_send(path) {
            Ok(()) => Offer::Enqueued,
            Err(mpsc::error::TrySendError::Full(_)) => Offer::Dropped,
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Offer according to the configured [`OverflowPolicy`].
    pub async fn offer(&self, path: PathBuf, cancel: &CancellationToken) -> Offer {
        match self.policy {
            OverflowPolicy::DropNewest => self.try_offer(path),
            OverflowPolicy::Block => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Offer::Cancelled,
                    sent = self.tx.send(path) => match sent {
                        Ok(()) => Offer::Enqueued,
                        Err(_) => Offer::Closed,
                    },
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct QueueConsumer {
    rx: Arc<Mutex<mpsc::Receiver<PathBuf>>>,
}

impl fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.rx.try_lock().map(|rx| rx.len()).ok();
        f.debug_struct("QueueConsumer")
            .field("pending", &pending)
            .finish()
    }
}

impl QueueConsumer {
    /// Wait for the next path in FIFO order. Returns `None` once `cancel`
    /// fires or the producer is gone and the queue is drained.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<PathBuf> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            path = async { self.rx.lock().await.recv().await } => path,
        }
    }
}
