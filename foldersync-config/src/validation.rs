use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use foldersync_core::FilePattern;
use foldersync_core::config::MAX_CAPACITY;
use thiserror::Error;

use crate::models::AppConfig;

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("folder {path} is configured more than once")]
    DuplicateFolder { path: PathBuf },
    #[error("folder entry has an empty path")]
    EmptyPath,
    #[error("folder {path} has an empty pattern")]
    EmptyPattern { path: PathBuf },
    #[error("sync.{field} must be greater than zero")]
    ZeroSize { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Reject configurations the runner cannot honour; collect the rest as
/// warnings. Malformed globs only warn: such a folder simply never matches.
pub fn validate(config: &AppConfig) -> Result<ConfigWarnings, ConfigValidationError> {
    let mut warnings = ConfigWarnings::default();

    if config.sync.queue_capacity == 0 {
        return Err(ConfigValidationError::ZeroSize {
            field: "queue_capacity",
        });
    }
    if config.sync.event_buffer == 0 {
        return Err(ConfigValidationError::ZeroSize {
            field: "event_buffer",
        });
    }
    if config.sync.workers == 0 {
        return Err(ConfigValidationError::ZeroSize { field: "workers" });
    }

    for (field, value) in [
        ("queue_capacity", config.sync.queue_capacity),
        ("event_buffer", config.sync.event_buffer),
    ] {
        if value > MAX_CAPACITY {
            warnings.push_with_hint(
                format!("sync.{field} = {value} exceeds {MAX_CAPACITY}"),
                format!("it is clamped to {MAX_CAPACITY}"),
            );
        }
    }

    if config.folders.is_empty() {
        warnings.push_with_hint(
            "no folders configured; nothing will be watched",
            "add at least one [[folders]] entry",
        );
    }

    let mut seen = HashSet::new();
    for folder in &config.folders {
        if folder.path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPath);
        }
        if !seen.insert(lexical_key(&folder.path)) {
            return Err(ConfigValidationError::DuplicateFolder {
                path: folder.path.clone(),
            });
        }
        if folder.pattern.trim().is_empty() {
            return Err(ConfigValidationError::EmptyPattern {
                path: folder.path.clone(),
            });
        }
        if !FilePattern::new(&folder.pattern).is_valid() {
            warnings.push_with_hint(
                format!(
                    "pattern '{}' for {} is malformed and will never match",
                    folder.pattern,
                    folder.path.display()
                ),
                "check bracket expressions such as [a-z]",
            );
        }
        if folder.pattern.contains('/') {
            warnings.push(format!(
                "pattern '{}' for {} contains '/'; patterns only see base names",
                folder.pattern,
                folder.path.display()
            ));
        }
        if folder.path.is_relative() {
            warnings.push(format!(
                "{} is relative and resolves against the working directory",
                folder.path.display()
            ));
        }
    }

    Ok(warnings)
}

/// Path with `.` segments and trailing separators removed, for duplicate checks.
fn lexical_key(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}
