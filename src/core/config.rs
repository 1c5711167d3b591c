use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

/// Environment variable that overrides `api.base_url`.
pub const API_URL_ENV: &str = "FUNDWATCH_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

impl ApiConfig {
    /// Never below one second; a zero timeout would fail every request.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Which requests draw from the same retry allowance.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryScope {
    /// Every request gets its own allowance.
    #[default]
    PerRequest,
    /// One allowance for the whole client, reset whenever any request succeeds.
    Shared,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub scope: RetryScope,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 3,
            base_delay_ms: 1000,
            scope: RetryScope::PerRequest,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    pub split_secs: u64,
    pub prices_secs: u64,
    pub sentiment_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            split_secs: 10,
            prices_secs: 15,
            sentiment_secs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::from_file(&config_path)?
        } else {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fundwatch", "fundwatch")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        Ok(Self::from_file(path)?.with_env_overrides())
    }

    fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    fn with_env_overrides(self) -> Self {
        self.with_base_url_override(std::env::var(API_URL_ENV).ok())
    }

    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            debug!("Overriding API base URL with {}", url);
            self.api.base_url = url;
        }
        self
    }
}
