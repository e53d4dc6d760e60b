use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use super::{FileHandler, HandlerError};

/// Top-level JSON object decoded from a dropped file.
pub type JsonDocument = Map<String, Value>;

type Processor = dyn Fn(&Path, JsonDocument) -> Result<(), HandlerError> + Send + Sync;

/// Reference handler: waits for the writer to settle, decodes the file as a
/// JSON object and forwards it to a caller-supplied function.
pub struct JsonFileHandler {
    settle_delay: Duration,
    processor: Arc<Processor>,
}

impl JsonFileHandler {
    pub fn new<F>(settle_delay: Duration, processor: F) -> Self
    where
        F: Fn(&Path, JsonDocument) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        Self {
            settle_delay,
            processor: Arc::new(processor),
        }
    }
}

impl fmt::Debug for JsonFileHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileHandler")
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FileHandler for JsonFileHandler {
    async fn process_file(&self, path: &Path) -> Result<(), HandlerError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        let bytes = tokio::fs::read(path).await?;
        let document: JsonDocument = serde_json::from_slice(&bytes)?;
        debug!(
            target: "foldersync::handler::json",
            path = %path.display(),
            keys = document.len(),
            "decoded json document"
        );

        (self.processor)(path, document)
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use serde_json::json;
    use tempfile::tempdir;

    use super::*;

    type Recorded = Arc<Mutex<Vec<(PathBuf, JsonDocument)>>>;

    fn recording_handler() -> (JsonFileHandler, Recorded) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = JsonFileHandler::new(Duration::ZERO, move |path, doc| {
            sink.lock().unwrap().push((path.to_path_buf(), doc));
            Ok(())
        });
        (handler, seen)
    }

    #[tokio::test]
    async fn forwards_decoded_object() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, r#"{"x":1}"#).unwrap();

        let (handler, seen) = recording_handler();
        handler.process_file(&file).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, file);
        assert_eq!(Value::Object(seen[0].1.clone()), json!({"x": 1}));
    }

    #[tokio::test]
    async fn malformed_json_is_a_decode_failure() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("broken.json");
        std::fs::write(&file, "{not json").unwrap();

        let (handler, seen) = recording_handler();
        let err = handler.process_file(&file).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_object_documents_are_rejected() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("list.json");
        std::fs::write(&file, "[1, 2, 3]").unwrap();

        let (handler, _seen) = recording_handler();
        let err = handler.process_file(&file).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_failure() {
        let dir = tempdir().unwrap();
        let (handler, _seen) = recording_handler();
        let err = handler
            .process_file(&dir.path().join("gone.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Io(_)));
    }

    #[tokio::test]
    async fn processor_failure_is_returned() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("a.json");
        std::fs::write(&file, r#"{"x":1}"#).unwrap();

        let handler = JsonFileHandler::new(Duration::ZERO, |_, _| {
            Err(HandlerError::Rejected("duplicate".into()))
        });
        let err = handler.process_file(&file).await.unwrap_err();
        assert!(matches!(err, HandlerError::Rejected(reason) if reason == "duplicate"));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_settle_delay_before_reading() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("late.json");

        let (inner, seen) = recording_handler();
        let handler = JsonFileHandler {
            settle_delay: Duration::from_secs(2),
            processor: inner.processor,
        };

        let path = file.clone();
        let task = tokio::spawn(async move { handler.process_file(&path).await });
        tokio::task::yield_now().await;

        // Written after detection but inside the settle window.
        std::fs::write(&file, r#"{"late":true}"#).unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        task.await.unwrap().unwrap();
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
