//! CLI command implementations

pub mod check;
pub mod clear;
pub mod config;
pub mod preload;
pub mod stats;
pub mod watch;

pub use check::execute as check;
pub use clear::execute as clear;
pub use config::execute as config;
pub use preload::execute as preload;
pub use preload::refresh;
pub use stats::execute as stats;
pub use watch::execute as watch;

use crate::config::Config;
use crate::orchestration::Orchestrator;
use crate::ui::{self, TaskSpinner, UiContext};

/// Build the orchestrator, warming the cache when configured to
///
/// Progress is only printed when `announce` is set, so machine-readable
/// output stays clean.
async fn start(config: &Config, ctx: &UiContext, announce: bool) -> Orchestrator {
    let orchestrator = Orchestrator::from_config(config);

    if config.cache.preload_on_startup && !announce {
        orchestrator.preload_all().await;
    } else if config.cache.preload_on_startup {
        let mut spinner = TaskSpinner::new(ctx);
        spinner.start("Warming cache...");
        let report = orchestrator.preload_all().await;
        let summary = format!(
            "Warmed {}/{} datasets",
            report.succeeded(),
            report.outcomes.len()
        );
        if report.is_complete() {
            spinner.stop(&summary);
        } else {
            spinner.stop_warn(&summary);
            ui::step_info(ctx, "Run: freshcache preload to see which datasets failed");
        }
    }

    orchestrator
}
