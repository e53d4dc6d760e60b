//! Configuration layer for foldersync.
//!
//! Loads an [`AppConfig`] from TOML or JSON (explicit path, environment, or a
//! default file next to the process), validates it, builds the configured
//! handlers, and drives a [`foldersync_core::FolderSync`] until shutdown. The
//! `foldersync` binary is a thin CLI over these pieces.

#![allow(missing_docs)]

pub mod handlers;
pub mod loader;
pub mod models;
pub mod runner;
pub mod validation;

pub use handlers::{LogFileHandler, build_handler};
pub use loader::{ConfigLoader, ConfigSource, load_from_file, parse_from_str, parse_json};
pub use models::{AppConfig, FolderSpec, HandlerSpec};
pub use runner::{register_folders, run, run_with};
pub use validation::{ConfigValidationError, ConfigWarning, ConfigWarnings, validate};
