//! File handlers: the unit of work invoked once per admitted file event.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

pub mod json;

pub use json::{JsonDocument, JsonFileHandler};

/// Why a handler could not process a file.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rejected: {0}")]
    Rejected(String),

    #[error("handler panicked: {0}")]
    Panicked(String),
}

/// Processes a single file detected in a watched folder.
///
/// Handlers may be invoked more than once for the same logical file (a create
/// followed by writes produces several events), so implementations should be
/// idempotent.
#[async_trait]
pub trait FileHandler: Send + Sync {
    async fn process_file(&self, path: &Path) -> Result<(), HandlerError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

impl fmt::Debug for dyn FileHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandler")
            .field("name", &self.name())
            .finish()
    }
}
