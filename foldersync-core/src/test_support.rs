use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::handler::{FileHandler, HandlerError};

/// Handler that remembers every path it was given.
#[derive(Default)]
pub(crate) struct RecordingHandler {
    seen: Mutex<Vec<PathBuf>>,
}

impl RecordingHandler {
    pub(crate) fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileHandler for RecordingHandler {
    async fn process_file(&self, path: &Path) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
