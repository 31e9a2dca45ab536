//! Processor selection

use crate::config::Config;
use crate::error::PackResult;
use crate::processor::local::LocalProcessor;
use crate::processor::remote::RemoteProcessor;
use crate::processor::runtime::Processor;
use crate::processor::tool::PackerTool;
use clap::ValueEnum;
use std::sync::Arc;
use std::time::Duration;

/// Where jobs execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProcessorKind {
    /// Run the packer on this machine
    #[default]
    Local,
    /// Send jobs to an execution service
    Remote,
}

impl ProcessorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProcessorKind::Local => "local",
            ProcessorKind::Remote => "remote",
        }
    }
}

/// Create the processor for `kind`.
///
/// `address` overrides `remote.address` from the config.
pub fn create_processor(
    kind: ProcessorKind,
    address: Option<&str>,
    config: &Config,
) -> PackResult<Arc<dyn Processor>> {
    match kind {
        ProcessorKind::Local => Ok(Arc::new(LocalProcessor::new(PackerTool::new(
            config.packer.program.clone(),
        )))),
        ProcessorKind::Remote => {
            let address = address.unwrap_or(&config.remote.address);
            let timeout = config.remote.timeout_secs.map(Duration::from_secs);
            Ok(Arc::new(RemoteProcessor::new(address, timeout)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_picks_processor_kind() {
        let config = Config::default();
        let local = create_processor(ProcessorKind::Local, None, &config).unwrap();
        assert_eq!(local.name(), "local");

        let remote =
            create_processor(ProcessorKind::Remote, Some("http://10.0.0.2:3456/"), &config)
                .unwrap();
        assert_eq!(remote.name(), "remote");
    }
}
