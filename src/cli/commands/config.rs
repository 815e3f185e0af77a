//! Config command - show or edit configuration

use crate::cache::FingerprintPolicy;
use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{parse_bool, parse_u64, parse_usize, Config, ConfigManager};
use crate::data::Dataset;
use crate::error::{CacheError, CacheResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use std::str::FromStr;

const VALID_KEYS: [&str; 13] = [
    "general.log_format",
    "cache.default_ttl_secs",
    "cache.max_items",
    "cache.preload_on_startup",
    "cache.parallel_preload",
    "cache.recent_window_secs",
    "cache.watch_interval_secs",
    "cache.refresh_cooldown_secs",
    "data.data_dir",
    "data.lookup_dir",
    "datasets.<name>.fingerprint",
    "datasets.<name>.ttl_secs",
    "datasets.<name>.path",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> CacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> CacheResult<()> {
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

/// Update one key in the config file, leaving environment overrides out of it
async fn set_value(manager: &ConfigManager, key: &str, value: &str) -> CacheResult<()> {
    let ctx = UiContext::detect();

    let mut config = if manager.path().exists() {
        manager.load_from_file(manager.path()).await?
    } else {
        Config::default()
    };

    if let Err(e) = apply(&mut config, key, value) {
        ui::step_error_detail(&ctx, "Cannot set config key", key);
        ui::step_info(&ctx, &format!("Valid keys: {}", VALID_KEYS.join(", ")));
        return Err(e);
    }

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> CacheResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(CacheError::User(format!(
                    "log_format must be text or json, got {}",
                    value
                )))
            }
        },

        ["cache", "default_ttl_secs"] => {
            config.cache.default_ttl_secs = optional_secs(key, value)?;
        }
        ["cache", "max_items"] => config.cache.max_items = parse_usize(key, value)?,
        ["cache", "preload_on_startup"] => config.cache.preload_on_startup = parse_bool(key, value)?,
        ["cache", "parallel_preload"] => config.cache.parallel_preload = parse_bool(key, value)?,
        ["cache", "recent_window_secs"] => config.cache.recent_window_secs = parse_u64(key, value)?,
        ["cache", "watch_interval_secs"] => config.cache.watch_interval_secs = parse_u64(key, value)?,
        ["cache", "refresh_cooldown_secs"] => {
            config.cache.refresh_cooldown_secs = parse_u64(key, value)?
        }

        ["data", "data_dir"] => config.data.data_dir = PathBuf::from(value),
        ["data", "lookup_dir"] => config.data.lookup_dir = PathBuf::from(value),

        ["datasets", name, field] => {
            let dataset = Dataset::from_str(name)?;
            let entry = config.datasets.entry(dataset.name().to_string()).or_default();
            match *field {
                "fingerprint" => entry.fingerprint = Some(value.parse::<FingerprintPolicy>()?),
                "ttl_secs" => entry.ttl_secs = optional_secs(key, value)?,
                "path" => entry.path = Some(PathBuf::from(value)),
                _ => return Err(CacheError::User(format!("Unknown config key: {}", key))),
            }
        }

        _ => return Err(CacheError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

// "none" clears the value
fn optional_secs(key: &str, value: &str) -> CacheResult<Option<u64>> {
    if value.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_u64(key, value).map(Some)
    }
}
