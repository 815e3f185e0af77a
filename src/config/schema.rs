//! Configuration schema for freshcache
//!
//! Configuration is stored at `~/.config/freshcache/config.toml`

use crate::cache::FingerprintPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache behaviour
    pub cache: CacheConfig,

    /// Data locations
    pub data: DataConfig,

    /// Per-dataset overrides, keyed by dataset name
    pub datasets: BTreeMap<String, DatasetConfig>,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Default entry TTL in seconds (unset = forever)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_ttl_secs: Option<u64>,

    /// Advisory entry limit, reported by stats but not enforced
    pub max_items: usize,

    /// Warm every dataset before serving
    pub preload_on_startup: bool,

    /// Warm datasets concurrently
    pub parallel_preload: bool,

    /// A tracked file modified within this many seconds triggers a refresh
    pub recent_window_secs: u64,

    /// Seconds between freshness checks while watching
    pub watch_interval_secs: u64,

    /// Minimum seconds between two watch-triggered refreshes
    pub refresh_cooldown_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: None,
            max_items: 500,
            preload_on_startup: true,
            parallel_preload: true,
            recent_window_secs: 300,
            watch_interval_secs: 10,
            refresh_cooldown_secs: 10,
        }
    }
}

/// Where dataset files live
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the data tables
    pub data_dir: PathBuf,

    /// Root of the lookup mappings
    pub lookup_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            lookup_dir: PathBuf::from("./lookup"),
        }
    }
}

/// Overrides for a single dataset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Fingerprint policy (default depends on the dataset kind)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<FingerprintPolicy>,

    /// Entry TTL in seconds, overriding `cache.default_ttl_secs`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    /// Backing file, relative to the dataset's root directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
        assert!(toml.contains("[data]"));
        assert!(!toml.contains("default_ttl_secs"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cache.default_ttl_secs, None);
        assert_eq!(config.cache.recent_window_secs, 300);
        assert!(config.cache.preload_on_startup);
        assert!(config.datasets.is_empty());
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            default_ttl_secs = 60

            [datasets.dpr_mapping]
            fingerprint = "mtime"

            [datasets.wps]
            ttl_secs = 5
            path = "wps/wps.csv"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.default_ttl_secs, Some(60));
        assert_eq!(config.cache.max_items, 500); // default preserved
        assert_eq!(
            config.datasets["dpr_mapping"].fingerprint,
            Some(FingerprintPolicy::Mtime)
        );
        assert_eq!(config.datasets["wps"].ttl_secs, Some(5));
        assert_eq!(
            config.datasets["wps"].path,
            Some(PathBuf::from("wps/wps.csv"))
        );
    }

    #[test]
    fn unknown_fingerprint_is_rejected() {
        let toml = r#"
            [datasets.wps]
            fingerprint = "sha1"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }
}
