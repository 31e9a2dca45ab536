//! In-process execution
//!
//! Runs the packer on this machine, writing straight into the output root.

use crate::error::PackResult;
use crate::plan::Job;
use crate::processor::runtime::Processor;
use crate::processor::tool::PackerTool;
use crate::protocol::InputFile;
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

/// Processor that invokes the packer locally
#[derive(Debug, Clone)]
pub struct LocalProcessor {
    tool: PackerTool,
}

impl LocalProcessor {
    pub fn new(tool: PackerTool) -> Self {
        Self { tool }
    }
}

#[async_trait]
impl Processor for LocalProcessor {
    async fn process(
        &self,
        job: &Job,
        _inputs: &[InputFile],
        output_root: &Path,
    ) -> PackResult<Vec<String>> {
        let sheet = output_root.join(&job.sheet);
        let data = output_root.join(&job.data);

        info!("{}: packing {} file(s) locally", job.id(), job.files.len());
        self.tool
            .run(job.id(), &job.params, &sheet, &data, &job.files)
            .await?;

        // Only the declared outputs are tracked; anything else the packer
        // writes is left alone
        let mut produced = Vec::with_capacity(2);
        for (name, path) in [(&job.sheet, &sheet), (&job.data, &data)] {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                produced.push(name.clone());
            } else {
                debug!("{}: packer did not write {}", job.id(), name);
            }
        }
        Ok(produced)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
