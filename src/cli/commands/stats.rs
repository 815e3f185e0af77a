//! Stats command - show cache contents and tracked file freshness

use super::start;
use crate::cli::args::{OutputFormat, StatsArgs};
use crate::config::Config;
use crate::error::CacheResult;
use crate::orchestration::FileFreshness;
use crate::stats::{get_stats, CacheStats};
use crate::ui::{self, UiContext};

/// Execute the stats command
pub async fn execute(args: StatsArgs, config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let orchestrator = start(config, &ctx, args.format == OutputFormat::Table).await;
    let stats = get_stats(
        orchestrator.cache().store(),
        orchestrator.tracked(),
        config.cache.max_items,
    );

    match args.format {
        OutputFormat::Table => print_table(&ctx, &stats),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Plain => {
            for key in &stats.keys {
                println!("{}", key);
            }
        }
    }

    Ok(())
}

fn print_table(ctx: &UiContext, stats: &CacheStats) {
    ui::intro(ctx, "freshcache stats");

    ui::section(ctx, "Cache");
    ui::key_value(ctx, "Entries", &stats.total_entries.to_string());
    ui::key_value_status(
        ctx,
        "Max items (advisory)",
        &stats.max_items.to_string(),
        !stats.over_capacity(),
    );

    let operations = stats.operations();
    if !operations.is_empty() {
        ui::section(ctx, "Entries by dataset");
        for (operation, count) in &operations {
            ui::key_value(ctx, operation, &count.to_string());
        }
    }

    ui::section(ctx, "Tracked files");
    for (path, freshness) in &stats.tracked_files {
        ui::key_value_status(
            ctx,
            &path.display().to_string(),
            &describe(freshness),
            freshness.exists,
        );
    }

    println!();
    println!(
        "{}/{} tracked file(s) present",
        stats.files_present(),
        stats.tracked_files.len()
    );
}

pub(super) fn describe(freshness: &FileFreshness) -> String {
    match (freshness.exists, freshness.last_modified) {
        (true, Some(modified)) => modified.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        (true, None) => "present".to_string(),
        (false, _) => "missing".to_string(),
    }
}
