use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::http::MAX_TIMEOUT;

pub const DEFAULT_GEOCODE_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_FX_URL: &str = "https://api.exchangerate.host/convert";

/// Lower bound for the default worker count.
pub const MIN_DEFAULT_WORKERS: usize = 4;

/// Base URLs of the three services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub geocode: String,
    pub forecast: String,
    pub fx: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            geocode: DEFAULT_GEOCODE_URL.to_string(),
            forecast: DEFAULT_FORECAST_URL.to_string(),
            fx: DEFAULT_FX_URL.to_string(),
        }
    }
}

/// Top-level configuration, read from disk if present.
///
/// Example TOML:
/// ```toml
/// timeout_secs = 5
/// workers = 8
///
/// [endpoints]
/// fx = "https://fx.internal.example/convert"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Per-call timeout; clamped to 1..=10 seconds.
    pub timeout_secs: u64,

    /// Worker count used when none is given on the command line.
    pub workers: Option<usize>,

    pub endpoints: Endpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: MAX_TIMEOUT.as_secs(),
            workers: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    /// Load config from the platform config directory, or defaults if there is no file.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load config from an explicit path. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;

        if cfg.workers == Some(0) {
            return Err(anyhow!("`workers` must be at least 1"));
        }

        Ok(cfg)
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "expense-enrich", "enrich")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT.as_secs()))
    }

    /// Resolve the worker count: explicit request, then config, then the machine default.
    pub fn worker_count(&self, requested: Option<usize>) -> usize {
        requested
            .or(self.workers)
            .filter(|n| *n > 0)
            .unwrap_or_else(default_worker_count)
    }
}

/// `max(4, available parallelism)`.
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MIN_DEFAULT_WORKERS)
        .max(MIN_DEFAULT_WORKERS)
}
