//! Pack command - run every job of an option tree

use crate::cache::ContentCache;
use crate::cli::args::PackArgs;
use crate::config::Config;
use crate::error::PackResult;
use crate::plan::plan_file;
use crate::processor::create_processor;
use crate::runner::{BatchReport, JobReport, JobStatus, Runner};
use crate::ui::{self, BatchProgress, UiContext};
use std::sync::Arc;
use tracing::debug;

/// Execute the pack command
pub async fn execute(args: PackArgs, config: &Config) -> PackResult<()> {
    let ctx = UiContext::detect();

    let plan = plan_file(&args.input, &config.job_defaults()).await?;
    let processor = create_processor(args.processor, args.address.as_deref(), config)?;

    let mut runner = Runner::new(processor, args.output.clone());
    if config.cache.enabled && !args.no_cache {
        let path = config.cache_path();
        debug!("Using cache {}", path.display());
        runner = runner.with_cache(Arc::new(ContentCache::new(path)));
    } else {
        debug!("Cache disabled");
    }

    let total = plan.jobs.len() + plan.failures.len();
    ui::intro(
        &ctx,
        &format!(
            "Packing {} sheet(s) ({}) into {}",
            total,
            args.processor.name(),
            args.output.display()
        ),
    );

    let progress = BatchProgress::new(&ctx, total as u64);
    let report = runner
        .run(plan, |job| progress.job_done(&job_line(&ctx, job)))
        .await;
    progress.finish();

    print_summary(&ctx, &report);
    report.check()
}

fn job_line(ctx: &UiContext, job: &JobReport) -> String {
    match &job.status {
        JobStatus::Built { produced } => {
            ui::line_ok(ctx, &format!("{} ({} file(s))", job.id, produced.len()))
        }
        JobStatus::UpToDate => ui::line_info(ctx, &format!("{} up to date", job.id)),
        JobStatus::Failed(e) => ui::line_error(ctx, &job.id, &e.to_string()),
    }
}

fn print_summary(ctx: &UiContext, report: &BatchReport) {
    let summary = format!(
        "{} built, {} up to date, {} failed",
        report.built(),
        report.up_to_date(),
        report.failed()
    );

    if report.total() == 0 {
        ui::outro_warn(ctx, "Nothing to pack");
    } else if report.failed() > 0 {
        ui::outro_error(ctx, &summary);
    } else {
        ui::outro_success(ctx, &summary);
    }
}
