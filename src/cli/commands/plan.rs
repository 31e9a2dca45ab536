//! Plan command - show the jobs an option tree expands to

use crate::cli::args::{OutputFormat, PlanArgs};
use crate::config::Config;
use crate::error::PackResult;
use crate::plan::{plan_file, Job, Plan};
use crate::ui::{self, UiContext};
use console::style;

/// Execute the plan command
pub async fn execute(args: PlanArgs, config: &Config) -> PackResult<()> {
    let plan = plan_file(&args.input, &config.job_defaults()).await?;

    match args.format {
        OutputFormat::Table => print_table(&plan),
        OutputFormat::Json => print_json(&plan.jobs)?,
        OutputFormat::Plain => print_plain(&plan.jobs),
    }

    Ok(())
}

fn print_table(plan: &Plan) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Jobs");

    if plan.jobs.is_empty() {
        ui::step_info(&ctx, "No jobs in this tree");
    } else {
        println!(
            "{:<32} {:<32} {:>6}  {}",
            style("SHEET").bold(),
            style("DATA").bold(),
            style("FILES").bold(),
            style("PARAMS").bold()
        );
        println!("{}", "-".repeat(90));

        for job in &plan.jobs {
            println!(
                "{:<32} {:<32} {:>6}  {}",
                job.sheet,
                job.data,
                job.files.len(),
                style(job.params.join(" ")).dim()
            );
        }

        println!();
        println!("{} job(s)", plan.jobs.len());
    }

    for failure in &plan.failures {
        ui::step_error(&ctx, &format!("node {}", failure.node), &failure.error.to_string());
    }
}

fn print_json(jobs: &[Job]) -> PackResult<()> {
    let json = serde_json::to_string_pretty(jobs)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(jobs: &[Job]) {
    for job in jobs {
        println!("{}", job.sheet);
    }
}
