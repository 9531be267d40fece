use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    /// Label recorded as the source of fetched rates
    pub name: String,
    pub base_url: String,
    pub coin: String,
    pub vs_currency: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            name: "CoinGecko".to_string(),
            base_url: "https://api.coingecko.com".to_string(),
            coin: "bitcoin".to_string(),
            vs_currency: "gel".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RateConfig {
    pub freshness_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RateConfig {
    fn default() -> Self {
        RateConfig {
            freshness_secs: 120,
            timeout_secs: 5,
        }
    }
}

impl RateConfig {
    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    /// Entries kept when the store runs out of space
    pub recovery_keep: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            max_entries: 50,
            recovery_keep: 10,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_path: Option<String>,
    pub quota_bytes: Option<usize>,
    pub persist: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_path: None,
            quota_bytes: Some(5 * 1024 * 1024),
            persist: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub rate: RateConfig,
    pub history: HistoryConfig,
    pub storage: StorageConfig,
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "satcalc", "satcalc").context("Could not determine project directories")
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no file has been set up yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.storage.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(project_dirs()?.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
