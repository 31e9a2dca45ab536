//! Job execution backends
//!
//! - local: run the packer on this machine
//! - remote: dispatch to an execution service (`sheetpack serve`)

mod factory;
mod local;
mod remote;
mod runtime;
pub mod tool;

pub use factory::{create_processor, ProcessorKind};
pub use local::LocalProcessor;
pub use remote::RemoteProcessor;
pub use runtime::Processor;
pub use tool::PackerTool;
