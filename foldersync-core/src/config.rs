use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest size a bounded channel accepts; larger settings are clamped.
pub const MAX_CAPACITY: usize = tokio::sync::Semaphore::MAX_PERMITS;

/// What the router does when the work queue is full.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Discard the path that did not fit and report the drop.
    #[default]
    DropNewest,
    /// Wait for queue space. The wait is still interrupted by `stop`.
    Block,
}

/// Runtime knobs for the synchronizer.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Capacity of the pending-path queue. Fixed for the lifetime of a run.
    pub queue_capacity: usize,
    /// Behaviour once `queue_capacity` paths are waiting. Also applies to
    /// the event source's buffer of raw changes.
    pub overflow: OverflowPolicy,
    /// Raw change notifications the event source may hold before the router
    /// takes them.
    pub event_buffer: usize,
    /// Number of dispatch workers draining the queue.
    pub workers: usize,
    /// Pause before a JSON handler built from configuration reads a file.
    pub settle_delay_ms: u64,
    /// Watch registered folders recursively. Files are still resolved by
    /// their exact parent directory.
    pub recursive: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            overflow: OverflowPolicy::default(),
            event_buffer: 1024,
            workers: 1,
            settle_delay_ms: 500,
            recursive: false,
        }
    }
}

impl SyncConfig {
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.clamp(1, MAX_CAPACITY)
    }

    pub fn event_buffer(&self) -> usize {
        self.event_buffer.clamp(1, MAX_CAPACITY)
    }

    pub fn workers(&self) -> usize {
        self.workers.max(1)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_clamped() {
        let cfg = SyncConfig {
            queue_capacity: 0,
            workers: 0,
            ..SyncConfig::default()
        };
        assert_eq!(cfg.queue_capacity(), 1);
        assert_eq!(cfg.workers(), 1);
    }

    #[test]
    fn oversized_channels_are_clamped() {
        let cfg = SyncConfig {
            queue_capacity: usize::MAX,
            event_buffer: usize::MAX,
            ..SyncConfig::default()
        };
        assert_eq!(cfg.queue_capacity(), MAX_CAPACITY);
        assert_eq!(cfg.event_buffer(), MAX_CAPACITY);

        // The clamped size is accepted by a bounded channel.
        let (_tx, _rx) = tokio::sync::mpsc::channel::<()>(cfg.queue_capacity());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SyncConfig =
            serde_json::from_str(r#"{"overflow":"block","workers":3}"#).unwrap();
        assert_eq!(cfg.overflow, OverflowPolicy::Block);
        assert_eq!(cfg.workers, 3);
        assert_eq!(cfg.queue_capacity, 100);
        assert_eq!(cfg.event_buffer, 1024);
        assert_eq!(cfg.settle_delay(), Duration::from_millis(500));
    }
}
