//! Watched-folder registry keyed by absolute directory path.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::{Result, SyncError};
use crate::handler::FileHandler;
use crate::pattern::FilePattern;

/// A watched directory together with its file pattern and handler.
#[derive(Clone)]
pub struct FolderConfig {
    pub path: PathBuf,
    pub pattern: FilePattern,
    pub handler: Arc<dyn FileHandler>,
}

impl FolderConfig {
    /// True when `file` sits directly inside this folder and its base name
    /// matches the pattern.
    pub fn claims(&self, file: &Path) -> bool {
        let Some(parent) = file.parent() else {
            return false;
        };
        let Some(name) = file.file_name() else {
            return false;
        };
        parent == self.path && self.pattern.is_match(&name.to_string_lossy())
    }
}

impl fmt::Debug for FolderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderConfig")
            .field("path", &self.path)
            .field("pattern", &self.pattern.as_str())
            .field("handler", &self.handler.name())
            .finish()
    }
}

/// Serializable view of a registered folder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FolderSummary {
    pub path: PathBuf,
    pub pattern: String,
    pub handler: String,
}

/// Shared path -> folder map. Every read and write goes through one lock, and
/// callers get owned clones back so the lock is never held while a handler
/// runs.
#[derive(Clone, Default)]
pub struct FolderRegistry {
    folders: Arc<RwLock<HashMap<PathBuf, FolderConfig>>>,
}

impl fmt::Debug for FolderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FolderRegistry");
        match self.folders.try_read() {
            Ok(guard) => {
                debug.field("folder_count", &guard.len());
            }
            Err(_) => {
                debug.field("folders", &"<locked>");
            }
        }
        debug.finish()
    }
}

impl FolderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `config.path`, returning the previous one.
    pub async fn insert(&self, config: FolderConfig) -> Option<FolderConfig> {
        self.folders
            .write()
            .await
            .insert(config.path.clone(), config)
    }

    /// Find the folder that owns `file`: its parent directory must be a
    /// registered path and its base name must match that folder's pattern.
    pub async fn resolve(&self, file: &Path) -> Option<FolderConfig> {
        let parent = file.parent()?;
        let guard = self.folders.read().await;
        guard
            .get(parent)
            .filter(|folder| folder.claims(file))
            .cloned()
    }

    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.folders.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub async fn summaries(&self) -> Vec<FolderSummary> {
        let guard = self.folders.read().await;
        let mut out: Vec<_> = guard
            .values()
            .map(|folder| FolderSummary {
                path: folder.path.clone(),
                pattern: folder.pattern.as_str().to_string(),
                handler: folder.handler.name().to_string(),
            })
            .collect();
        drop(guard);
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }
}

/// Resolve `path` against the working directory, create it if missing and
/// return its canonical form so it compares equal to paths reported by the OS.
pub async fn prepare_directory(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };

    tokio::fs::create_dir_all(&absolute)
        .await
        .map_err(|source| SyncError::DirectoryCreate {
            path: absolute.clone(),
            source,
        })?;

    tokio::fs::canonicalize(&absolute)
        .await
        .map_err(|source| SyncError::DirectoryCreate {
            path: absolute,
            source,
        })
}
