//! Check command - report tracked file freshness and refresh on recent changes

use super::start;
use super::stats::describe;
use crate::cli::args::{CheckArgs, OutputFormat};
use crate::config::Config;
use crate::error::CacheResult;
use crate::orchestration::{FileFreshness, FreshnessReport, FreshnessState};
use crate::ui::{self, UiContext};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Serialize)]
struct FileReport {
    #[serde(flatten)]
    freshness: FileFreshness,
    state: FreshnessState,
}

#[derive(Serialize)]
struct CheckReport {
    window_secs: u64,
    files: BTreeMap<PathBuf, FileReport>,
    refreshed: bool,
    #[serde(skip)]
    skipped: bool,
}

/// Execute the check command
pub async fn execute(args: CheckArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let window = Duration::from_secs(args.window.unwrap_or(config.cache.recent_window_secs));
    let orchestrator = start(config, &ctx, args.format == OutputFormat::Table).await;

    let freshness = orchestrator.check_freshness();
    let report = classify(freshness, window);
    let refreshed = if args.no_refresh {
        false
    } else {
        orchestrator.auto_refresh_if_needed(window).await
    };

    let report = CheckReport {
        window_secs: window.as_secs(),
        files: report,
        refreshed,
        skipped: args.no_refresh,
    };

    match args.format {
        OutputFormat::Table => print_table(&ctx, &report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for (path, file) in &report.files {
                println!("{}\t{}", path.display(), file.state);
            }
        }
    }

    Ok(())
}

fn classify(freshness: FreshnessReport, window: Duration) -> BTreeMap<PathBuf, FileReport> {
    let now = Utc::now();
    freshness
        .into_iter()
        .map(|(path, freshness)| {
            let state = freshness.state(now, window, None);
            (path, FileReport { freshness, state })
        })
        .collect()
}

fn print_table(ctx: &UiContext, report: &CheckReport) {
    ui::intro(ctx, "freshcache check");

    for (path, file) in &report.files {
        let detail = format!("{}, {}", file.state, describe(&file.freshness));
        match file.state {
            FreshnessState::Fresh => ui::step_ok_detail(ctx, &path.display().to_string(), &detail),
            FreshnessState::RecentlyModified => ui::step_warn_hint(
                ctx,
                &path.display().to_string(),
                &format!("modified in the last {}s", report.window_secs),
            ),
            FreshnessState::Unknown => {
                ui::step_warn_hint(ctx, &path.display().to_string(), "missing")
            }
        }
    }

    if report.skipped {
        ui::outro_success(ctx, "Freshness reported, refresh skipped");
    } else if report.refreshed {
        ui::outro_success(ctx, "Recent changes found, cache refreshed");
    } else {
        ui::outro_success(ctx, "No refresh needed");
    }
}
