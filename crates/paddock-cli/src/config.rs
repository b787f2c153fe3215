//! `paddock.toml`: API endpoint, store locations, export path, worker count

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use paddock_core::ApiConfig;
use paddock_core::api::DEFAULT_BASE_URL;
use serde::Deserialize;

/// Global configuration for paddock
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiSettings,
    pub storage: StorageConfig,
    pub export: ExportSettings,
    pub workers: WorkersConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ApiSettings {
    pub fn client_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite task database
    pub task_db: PathBuf,
    /// DuckDB warehouse
    pub warehouse: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            task_db: PathBuf::from("processing.db"),
            warehouse: PathBuf::from("motogp.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub path: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("motogp.parquet"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub count: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { count: 5 }
    }
}

impl Config {
    /// Files tried by [`Config::load`], most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("paddock.toml")];
        if let Some(dirs) = directories::ProjectDirs::from("", "", "paddock") {
            paths.push(dirs.config_dir().join("config.toml"));
        }
        paths
    }

    /// First existing file of [`Config::search_paths`], else defaults.
    pub fn load() -> Result<Self> {
        match Self::search_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("no paddock.toml found, running on defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config = toml::from_str::<Self>(&raw)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        log::info!("config: {}", path.display());
        Ok(config)
    }
}
