//! freshcache - file-fingerprinted data cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use freshcache::cli::args::{ConfigAction, ConfigArgs};
use freshcache::cli::{commands, Cli, Commands};
use freshcache::config::{Config, ConfigManager};
use freshcache::error::CacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // These must work even when the config file is broken
    let loads_config = !matches!(
        cli.command,
        Commands::Config(ConfigArgs {
            action: Some(ConfigAction::Path | ConfigAction::Init { .. } | ConfigAction::Set { .. })
        })
    );
    let mut config = if loads_config {
        config_manager.load().await?
    } else {
        Config::default()
    };

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config {}", config_manager.path().display());

    if cli.no_preload {
        config.cache.preload_on_startup = false;
    }

    match cli.command {
        Commands::Preload(args) => commands::preload(args, &config).await,
        Commands::Refresh(args) => commands::refresh(args, &config).await,
        Commands::Clear => commands::clear(&config).await,
        Commands::Stats(args) => commands::stats(args, &config).await,
        Commands::Check(args) => commands::check(args, &config).await,
        Commands::Watch(args) => commands::watch(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &config_manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("freshcache=warn"),
        1 => EnvFilter::new("freshcache=info"),
        _ => EnvFilter::new("freshcache=debug"),
    };

    if format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
