//! Watch command - refresh the cache whenever a tracked file changes

use super::start;
use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::error::{CacheError, CacheResult};
use crate::orchestration::WatchSettings;
use crate::ui::{self, UiContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Execute the watch command; runs until Ctrl-C or SIGTERM
pub async fn execute(args: WatchArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let mut settings = WatchSettings::from_config(&config.cache);
    if let Some(secs) = args.interval {
        settings.interval = Duration::from_secs(secs.max(1));
    }
    if let Some(secs) = args.window {
        settings.window = Duration::from_secs(secs);
    }

    let orchestrator = Arc::new(start(config, &ctx, true).await);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = orchestrator.clone().spawn_watch(settings, shutdown_rx);

    ui::step_info(
        &ctx,
        &format!(
            "Watching {} files every {}s (Ctrl-C to stop)",
            orchestrator.tracked().len(),
            settings.interval.as_secs()
        ),
    );

    wait_for_shutdown_signal().await?;
    let _ = shutdown_tx.send(true);
    handle
        .await
        .map_err(|e| CacheError::Internal(format!("watch task failed: {}", e)))?;

    match orchestrator.last_refresh() {
        Some(at) => ui::step_ok_detail(
            &ctx,
            "Watch stopped",
            &format!("last refresh {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
        ),
        None => ui::step_ok(&ctx, "Watch stopped, no refresh was needed"),
    }
    Ok(())
}

async fn wait_for_shutdown_signal() -> CacheResult<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate())
            .map_err(|e| CacheError::io("installing SIGTERM handler", e))?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.map_err(|e| CacheError::io("waiting for Ctrl-C", e))?
            }
            _ = term.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| CacheError::io("waiting for Ctrl-C", e))?;
    }

    Ok(())
}
