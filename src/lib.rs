//! sheetpack - Sprite sheet batch packer
//!
//! Expands a hierarchical option tree into sprite-sheet packing jobs,
//! skips jobs whose outputs are still valid, and runs the rest through an
//! external packer either locally or on a remote execution service.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod plan;
pub mod processor;
pub mod protocol;
pub mod runner;
pub mod server;
pub mod ui;

pub use error::{PackError, PackResult};
