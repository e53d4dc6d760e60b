use std::path::PathBuf;

use foldersync_core::SyncConfig;
use serde::{Deserialize, Serialize};

fn default_pattern() -> String {
    "*".to_string()
}

/// Top-level configuration: runtime knobs plus the folders to watch.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Queue size, overflow policy, worker count and default settle delay.
    pub sync: SyncConfig,
    /// Watched folders. Each path may appear once.
    pub folders: Vec<FolderSpec>,
}

/// One watched folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderSpec {
    /// Directory to watch. Created when missing; relative paths resolve
    /// against the working directory.
    pub path: PathBuf,
    /// Glob applied to file base names (`*`, `?`, `[...]`).
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub handler: HandlerSpec,
}

/// Which built-in handler processes matching files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HandlerSpec {
    /// Decode the file as a JSON object and log it.
    Json {
        /// Overrides `sync.settle_delay_ms` for this folder.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settle_delay_ms: Option<u64>,
    },
    /// Log the path and size only.
    Log,
}

impl Default for HandlerSpec {
    fn default() -> Self {
        HandlerSpec::Json {
            settle_delay_ms: None,
        }
    }
}

impl HandlerSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerSpec::Json { .. } => "json",
            HandlerSpec::Log => "log",
        }
    }
}
