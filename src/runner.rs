//! Batch execution
//!
//! Runs every planned job through one processor. Jobs are polled
//! concurrently on the calling task; a failing job never stops the others.
//! With a cache attached, a job whose recorded outputs are still intact is
//! skipped, and a job that succeeds has its outputs recorded.

use crate::cache::{ContentCache, Fingerprint};
use crate::error::{PackError, PackResult};
use crate::plan::{Job, Plan};
use crate::processor::Processor;
use crate::protocol::load_inputs;
use futures_util::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one job
#[derive(Debug)]
pub enum JobStatus {
    /// The processor ran and produced these paths
    Built { produced: Vec<String> },
    /// Cached outputs were intact; nothing ran
    UpToDate,
    Failed(PackError),
}

/// Result line for one job
#[derive(Debug)]
pub struct JobReport {
    /// Sheet name, or the tree node for jobs that never got planned
    pub id: String,
    pub status: JobStatus,
}

/// Results for a whole batch, in plan order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.jobs.len()
    }

    pub fn built(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Built { .. }))
    }

    pub fn up_to_date(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::UpToDate))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, JobStatus::Failed(_)))
    }

    /// `BatchFailed` if any job failed
    pub fn check(&self) -> PackResult<()> {
        match self.failed() {
            0 => Ok(()),
            failed => Err(PackError::BatchFailed {
                failed,
                total: self.total(),
            }),
        }
    }

    fn count(&self, pred: impl Fn(&JobStatus) -> bool) -> usize {
        self.jobs.iter().filter(|j| pred(&j.status)).count()
    }
}

/// Executes plans against one processor and output root
pub struct Runner {
    processor: Arc<dyn Processor>,
    cache: Option<Arc<ContentCache>>,
    output_root: PathBuf,
}

impl Runner {
    pub fn new(processor: Arc<dyn Processor>, output_root: PathBuf) -> Self {
        Self {
            processor,
            cache: None,
            output_root,
        }
    }

    /// Consult and update `cache` around every job
    pub fn with_cache(mut self, cache: Arc<ContentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Run every job of `plan`, calling `on_done` as each one finishes.
    ///
    /// Nodes that failed during planning are reported as failed jobs.
    pub async fn run<F>(&self, plan: Plan, on_done: F) -> BatchReport
    where
        F: Fn(&JobReport),
    {
        let mut jobs: Vec<JobReport> = plan
            .failures
            .into_iter()
            .map(|failure| {
                error!("node {}: {}", failure.node, failure.error);
                JobReport {
                    id: format!("node {}", failure.node),
                    status: JobStatus::Failed(failure.error),
                }
            })
            .collect();
        for report in &jobs {
            on_done(report);
        }

        info!(
            "Running {} job(s) with the {} processor",
            plan.jobs.len(),
            self.processor.name()
        );

        let on_done = &on_done;
        let runs = plan.jobs.iter().map(|job| async move {
            let status = match self.run_job(job).await {
                Ok(status) => status,
                Err(e) => {
                    error!("{}: {}", job.id(), e);
                    JobStatus::Failed(e)
                }
            };
            let report = JobReport {
                id: job.id().to_string(),
                status,
            };
            on_done(&report);
            report
        });
        jobs.extend(join_all(runs).await);

        BatchReport { jobs }
    }

    /// Run one job: skip it if cached outputs are intact, otherwise process
    /// it and record what it produced.
    pub async fn run_job(&self, job: &Job) -> PackResult<JobStatus> {
        let inputs = load_inputs(&job.files).await?;
        let fingerprint = Fingerprint::compute(job, &inputs)?;
        debug!("{}: fingerprint {}", job.id(), fingerprint.short());

        if let Some(cache) = &self.cache {
            if !cache.needs_rebuild(&fingerprint, &self.output_root).await {
                info!("{}: up to date", job.id());
                return Ok(JobStatus::UpToDate);
            }
        }

        let produced = self
            .processor
            .process(job, &inputs, &self.output_root)
            .await?;
        info!("{}: built {} file(s)", job.id(), produced.len());

        if let Some(cache) = &self.cache {
            // The outputs are on disk either way; a failed record only
            // means the next run builds again
            if let Err(e) = cache.store(&fingerprint, &self.output_root, &produced).await {
                warn!("{}: built but not cached: {}", job.id(), e);
            }
        }

        Ok(JobStatus::Built { produced })
    }
}
