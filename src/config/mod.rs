//! Configuration management for freshcache

pub mod schema;

pub use schema::{CacheConfig, Config, DataConfig, DatasetConfig, GeneralConfig};

use crate::data::Dataset;
use crate::error::{CacheError, CacheResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tracing::{debug, info};

// Environment variables that override file settings
pub const ENV_DEFAULT_TTL: &str = "CACHE_DEFAULT_TTL";
pub const ENV_PRELOAD: &str = "PRELOAD_CACHE";
pub const ENV_MAX_ITEMS: &str = "MAX_CACHE_ITEMS";
pub const ENV_RECENT_WINDOW: &str = "CACHE_RECENT_WINDOW";
pub const ENV_DATA_DIR: &str = "CACHE_DATA_DIR";
pub const ENV_LOOKUP_DIR: &str = "CACHE_LOOKUP_DIR";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("freshcache")
            .join("config.toml")
    }

    /// Load configuration, falling back to defaults if the file is missing
    ///
    /// Environment overrides are applied on top of whatever was loaded.
    pub async fn load(&self) -> CacheResult<Config> {
        let mut config = if self.config_path.exists() {
            self.load_from_file(&self.config_path).await?
        } else {
            debug!("Config file not found, using defaults");
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CacheError::io(format!("reading config from {}", path.display()), e))?;

        let config: Config = toml::from_str(&content).map_err(|e| CacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        validate(&config).map_err(|reason| CacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> CacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            CacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> CacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(config: &Config) -> Result<(), String> {
    for name in config.datasets.keys() {
        Dataset::from_str(name).map_err(|e| e.to_string())?;
    }
    match config.general.log_format.as_str() {
        "text" | "json" => Ok(()),
        other => Err(format!("log_format must be \"text\" or \"json\", got \"{}\"", other)),
    }
}

/// Apply the process environment on top of `config`
pub fn apply_env_overrides(config: &mut Config) -> CacheResult<()> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> CacheResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_DEFAULT_TTL) {
        config.cache.default_ttl_secs = Some(parse_u64(ENV_DEFAULT_TTL, &value)?);
    }
    if let Some(value) = lookup(ENV_PRELOAD) {
        config.cache.preload_on_startup = parse_bool(ENV_PRELOAD, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_ITEMS) {
        config.cache.max_items = parse_usize(ENV_MAX_ITEMS, &value)?;
    }
    if let Some(value) = lookup(ENV_RECENT_WINDOW) {
        config.cache.recent_window_secs = parse_u64(ENV_RECENT_WINDOW, &value)?;
    }
    if let Some(value) = lookup(ENV_DATA_DIR) {
        config.data.data_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup(ENV_LOOKUP_DIR) {
        config.data.lookup_dir = PathBuf::from(value);
    }
    Ok(())
}

pub(crate) fn parse_bool(name: &str, value: &str) -> CacheResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(CacheError::User(format!(
            "Invalid boolean for {}: {}. Use true/false",
            name, value
        ))),
    }
}

pub(crate) fn parse_u64(name: &str, value: &str) -> CacheResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| CacheError::User(format!("Invalid number for {}: {}", name, value)))
}

pub(crate) fn parse_usize(name: &str, value: &str) -> CacheResult<usize> {
    let parsed = parse_u64(name, value)?;
    usize::try_from(parsed)
        .map_err(|_| CacheError::User(format!("{} is too large for {}", value, name)))
}
