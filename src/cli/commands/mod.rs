//! CLI command implementations

pub mod cache;
pub mod config;
pub mod pack;
pub mod plan;
pub mod serve;

pub use cache::execute as cache;
pub use config::execute as config;
pub use pack::execute as pack;
pub use plan::execute as plan;
pub use serve::execute as serve;
