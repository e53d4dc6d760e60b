use std::path::PathBuf;

use thiserror::Error;

/// Setup failures returned to callers of [`FolderSync`](crate::FolderSync).
///
/// Runtime problems (transport errors, queue overflow, handler failures) are
/// never surfaced here; they are logged and reported to the observer instead.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("failed to create watched directory {path}: {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to watch {path}: {reason}")]
    WatchAttach { path: PathBuf, reason: String },

    #[error("event source unavailable: {0}")]
    SourceOpen(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
