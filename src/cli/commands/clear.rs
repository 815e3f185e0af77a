//! Clear command - empty the cache

use crate::config::Config;
use crate::error::CacheResult;
use crate::orchestration::Orchestrator;
use crate::ui::{self, UiContext};

/// Execute the clear command
///
/// Never warms the cache first. In a one-shot process the store starts
/// empty, so this reports how many entries were actually dropped.
pub async fn execute(config: &Config) -> CacheResult<()> {
    let ctx = UiContext::detect();
    let orchestrator = Orchestrator::from_config(config);

    let removed = orchestrator.cache().store().len();
    orchestrator.clear();

    ui::step_ok_detail(&ctx, "Cache cleared", &format!("{} entries removed", removed));
    Ok(())
}
