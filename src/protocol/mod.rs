//! Remote dispatch protocol
//!
//! Shared by the remote processor (client side) and the execution service.

pub mod archive;
pub mod wire;

pub use archive::Archive;
pub use wire::{load_inputs, InputFile, PackRequest, PackResponse};
