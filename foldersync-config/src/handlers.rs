//! Built-in handlers selectable from configuration.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use foldersync_core::{FileHandler, HandlerError, JsonFileHandler, SyncConfig};
use tracing::info;

use crate::models::HandlerSpec;

/// Logs each matching file's path and size without reading it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFileHandler;

#[async_trait]
impl FileHandler for LogFileHandler {
    async fn process_file(&self, path: &Path) -> Result<(), HandlerError> {
        let metadata = tokio::fs::metadata(path).await?;
        info!(
            target: "foldersync::handler",
            path = %path.display(),
            bytes = metadata.len(),
            "file received"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

pub fn build_handler(spec: &HandlerSpec, sync: &SyncConfig) -> Arc<dyn FileHandler> {
    match spec {
        HandlerSpec::Json { settle_delay_ms } => {
            let delay = settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| sync.settle_delay());
            Arc::new(JsonFileHandler::new(delay, |path, document| {
                let keys: Vec<&str> = document.keys().map(String::as_str).collect();
                info!(
                    target: "foldersync::handler",
                    path = %path.display(),
                    fields = document.len(),
                    keys = ?keys,
                    "json document received"
                );
                Ok(())
            }))
        }
        HandlerSpec::Log => Arc::new(LogFileHandler),
    }
}
