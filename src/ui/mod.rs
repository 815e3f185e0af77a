//! Console output for the CLI
//!
//! Uses `cliclack` framing and spinners in an interactive terminal, with a
//! plain tagged fallback when stdout is piped or running under CI.
//!
//! # Example
//!
//! ```rust,ignore
//! use freshcache::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "freshcache preload");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading datasets...");
//! spinner.stop("12 datasets loaded");
//!
//! ui::step_warn_hint(&ctx, "steo_dpr failed", "Check data.data_dir");
//! ui::outro_success(&ctx, "Cache warm");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, key_value_status, outro_success, outro_warn, section, step_error_detail,
    step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::TaskSpinner;
