//! UI module for consistent CLI output
//!
//! Styled with `console`, with an `indicatif` progress bar for batches and
//! automatic fallback to plain output in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use sheetpack::ui::{self, BatchProgress, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "Packing sprite sheets");
//!
//! let progress = BatchProgress::new(&ctx, jobs.len() as u64);
//! // ... for each finished job ...
//! progress.job_done(&ui::line_ok(&ctx, "ui.pvr.ccz"));
//! progress.finish();
//!
//! ui::outro_success(&ctx, "2 built, 1 up to date");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, line_error, line_info, line_ok, outro_error, outro_success, outro_warn,
    remark, step_error, step_info, step_ok, step_warn,
};
pub use progress::BatchProgress;
