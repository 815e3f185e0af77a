//! Preload and refresh commands - warm the cache and report per dataset

use crate::cli::args::{OutputFormat, PreloadArgs};
use crate::config::Config;
use crate::error::CacheResult;
use crate::orchestration::{Orchestrator, PreloadReport};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the preload command
pub async fn execute(args: PreloadArgs, config: &Config) -> CacheResult<()> {
    let orchestrator = Orchestrator::from_config(config)
        .with_parallel(config.cache.parallel_preload && !args.sequential);
    let report = orchestrator.preload_all().await;
    render(&report, args.format, "Preload")
}

/// Execute the refresh command
pub async fn refresh(args: PreloadArgs, config: &Config) -> CacheResult<()> {
    let orchestrator = Orchestrator::from_config(config)
        .with_parallel(config.cache.parallel_preload && !args.sequential);
    let report = orchestrator.refresh_all().await;
    render(&report, args.format, "Refresh")
}

fn render(report: &PreloadReport, format: OutputFormat, title: &str) -> CacheResult<()> {
    match format {
        OutputFormat::Table => print_table(report, title),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Plain => {
            for outcome in &report.outcomes {
                let status = if outcome.is_ok() { "ok" } else { "failed" };
                println!("{}\t{}", outcome.dataset, status);
            }
        }
    }
    Ok(())
}

fn print_table(report: &PreloadReport, title: &str) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("freshcache {}", title.to_lowercase()));

    for outcome in &report.outcomes {
        match &outcome.error {
            None => ui::step_ok_detail(
                &ctx,
                outcome.dataset.name(),
                &format!("{}ms", outcome.elapsed_ms),
            ),
            Some(error) => ui::step_error_detail(&ctx, outcome.dataset.name(), error),
        }
    }

    let summary = format!(
        "{} complete: {}/{} datasets in {}ms",
        title,
        report.succeeded(),
        report.outcomes.len(),
        report.elapsed_ms
    );
    if report.is_complete() {
        ui::outro_success(&ctx, &summary);
    } else {
        ui::outro_warn(&ctx, &summary);
        if report.failures().any(|o| o.retryable) {
            eprintln!(
                "{} Failed datasets are loaded on first use and their errors surface then",
                style("Hint:").yellow()
            );
        }
    }
}
