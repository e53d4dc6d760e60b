use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};

use crate::models::AppConfig;

pub const CONFIG_PATH_ENV: &str = "FOLDERSYNC_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "FOLDERSYNC_CONFIG_JSON";

const DEFAULT_CANDIDATES: &[&str] = &[
    "foldersync.toml",
    "foldersync.json",
    "config/foldersync.toml",
    "config/foldersync.json",
];

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    Explicit(PathBuf),
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Resolves configuration in order:
/// 1) an explicit path (the `--config` flag),
/// 2) `$FOLDERSYNC_CONFIG_PATH` (TOML or JSON file),
/// 3) `$FOLDERSYNC_CONFIG_JSON` (inline JSON),
/// 4) the first default file found under the search root,
/// 5) defaults.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
    env_path: Option<String>,
    env_json: Option<String>,
    search_root: PathBuf,
}

impl ConfigLoader {
    /// Loader seeded from the process environment and working directory.
    pub fn from_env() -> Self {
        Self {
            explicit: None,
            env_path: env::var(CONFIG_PATH_ENV).ok(),
            env_json: env::var(CONFIG_JSON_ENV).ok(),
            search_root: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    pub fn with_explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn with_env_path(mut self, value: Option<String>) -> Self {
        self.env_path = value;
        self
    }

    pub fn with_env_json(mut self, value: Option<String>) -> Self {
        self.env_json = value;
        self
    }

    pub fn with_search_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.search_root = root.into();
        self
    }

    pub fn load(&self) -> anyhow::Result<(AppConfig, ConfigSource)> {
        if let Some(path) = &self.explicit {
            let config = load_from_file(path)?;
            return Ok((config, ConfigSource::Explicit(path.clone())));
        }

        if let Some(path_str) = &self.env_path
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str.trim());
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = &self.env_json
            && !raw.trim().is_empty()
        {
            let parsed = parse_json(raw)
                .context("failed to parse FOLDERSYNC_CONFIG_JSON")?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = self.find_default_file() {
            let config = load_from_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((AppConfig::default(), ConfigSource::Default))
    }

    fn find_default_file(&self) -> Option<PathBuf> {
        DEFAULT_CANDIDATES
            .iter()
            .map(|candidate| self.search_root.join(candidate))
            .find(|path| path.is_file())
    }
}

pub fn load_from_file(path: &Path) -> anyhow::Result<AppConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents)
            .with_context(|| format!("invalid config {}", path.display())),
        Some("toml") => toml::from_str(&contents)
            .map_err(|err| anyhow!("invalid config {}: {}", path.display(), err)),
        _ => parse_from_str(&contents, &path.display().to_string()),
    }
}

pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<AppConfig> {
    // Try TOML first, then JSON.
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

pub fn parse_json(raw: &str) -> anyhow::Result<AppConfig> {
    serde_json::from_str(raw).map_err(|err| anyhow!("invalid config json: {err}"))
}
