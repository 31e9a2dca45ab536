//! Content-addressed output cache
//!
//! Decides whether a pack job has to run again. Jobs are keyed by a
//! fingerprint of their parameters, output names and input contents;
//! each key records the outputs the job produced and their hashes.
//!
//! # Staleness
//!
//! | Record | Outputs on disk | Result |
//! |--------|-----------------|--------|
//! | absent | any | rebuild |
//! | present | all present, hashes match | up to date |
//! | present | any missing or changed | rebuild |
//!
//! Outputs written without a record (an interrupted extraction, say) are
//! treated as stale: validity needs the record, not just the files.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{digest, Fingerprint};
pub use store::{CacheDocument, CacheEntry, ContentCache};
