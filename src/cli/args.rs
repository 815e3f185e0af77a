//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// freshcache - file-fingerprinted dataset cache
///
/// Loads the catalogued datasets through an in-memory cache that treats an
/// entry as stale as soon as a file behind it changes.
#[derive(Parser, Debug)]
#[command(name = "freshcache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FRESHCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip warming the cache before running the command
    #[arg(long, global = true)]
    pub no_preload: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every dataset into the cache
    Preload(PreloadArgs),

    /// Clear the cache and load every dataset again
    Refresh(PreloadArgs),

    /// Remove every cache entry
    Clear,

    /// Show cache entries and tracked file freshness
    Stats(StatsArgs),

    /// Check tracked files and refresh if one changed recently
    Check(CheckArgs),

    /// Keep checking tracked files until interrupted
    Watch(WatchArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for preload and refresh
#[derive(Parser, Debug)]
pub struct PreloadArgs {
    /// Load datasets one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the stats command
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Recent-modification window in seconds (default: from config)
    #[arg(short, long)]
    pub window: Option<u64>,

    /// Report freshness only, never refresh
    #[arg(long)]
    pub no_refresh: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Seconds between checks (default: from config)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Recent-modification window in seconds (default: from config)
    #[arg(short, long)]
    pub window: Option<u64>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., cache.recent_window_secs)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}
