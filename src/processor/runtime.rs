//! Processor abstraction
//!
//! A processor turns one job into files under an output root. The local
//! processor runs the packer itself; the remote processor ships the job to
//! an execution service and unpacks what comes back.

use crate::error::PackResult;
use crate::plan::Job;
use crate::protocol::InputFile;
use async_trait::async_trait;
use std::path::Path;

/// Abstract pack job executor
#[async_trait]
pub trait Processor: Send + Sync {
    /// Execute `job` and return the produced paths, relative to
    /// `output_root`.
    ///
    /// `inputs` holds the job's files already read into memory, sorted by
    /// name. Processors that can reach the files directly may ignore it.
    async fn process(
        &self,
        job: &Job,
        inputs: &[InputFile],
        output_root: &Path,
    ) -> PackResult<Vec<String>>;

    /// Human-readable processor name for display
    fn name(&self) -> &'static str;
}
