//! Job construction from merged option bags

use crate::error::{PackError, PackResult};
use crate::plan::params;
use crate::plan::tree::OptionBag;
use glob::Pattern;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Option keys understood by the job builder
pub mod keys {
    pub const INPUT_FILES: &str = "input_files";
    pub const OUTPUT_PATH: &str = "output_path";
    pub const ROTATION: &str = "rotation";
    pub const AUTO_ALIAS: &str = "auto_alias";
    pub const FORCE_IDENTICAL_LAYOUT: &str = "force_identical_layout";
    pub const SHEET_EXTENSION: &str = "sheet_extension";
    pub const DATA_EXTENSION: &str = "data_extension";
}

/// One concrete unit of packing work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    /// Flattened packer parameters, derived switches appended
    pub params: Vec<String>,

    /// Input images, in pattern order
    pub files: Vec<PathBuf>,

    /// Sheet path relative to the output root
    pub sheet: String,

    /// Data path relative to the output root
    pub data: String,
}

impl Job {
    /// Short identifier used in logs and reports
    pub fn id(&self) -> &str {
        &self.sheet
    }
}

/// Extensions applied when a bag does not set its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefaults {
    pub sheet_extension: String,
    pub data_extension: String,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            sheet_extension: "pvr.ccz".to_string(),
            data_extension: "plist".to_string(),
        }
    }
}

/// Build the job described by a bag, if any.
///
/// Returns `Ok(None)` for bags without `input_files` or `output_path`;
/// those only exist to share options with their descendants.
pub fn build(bag: &OptionBag, base_dir: &Path, defaults: &JobDefaults) -> PackResult<Option<Job>> {
    let patterns: Option<Vec<Vec<String>>> = option(bag, keys::INPUT_FILES)?;
    let output_path: Option<Vec<String>> = option(bag, keys::OUTPUT_PATH)?;
    let (patterns, output_path) = match (patterns, output_path) {
        (Some(patterns), Some(output_path)) => (patterns, output_path),
        _ => return Ok(None),
    };
    if output_path.is_empty() || output_path.iter().any(|s| s.is_empty()) {
        return Err(PackError::InvalidConfiguration(
            "output_path must be a non-empty list of non-empty segments".to_string(),
        ));
    }

    let mut job_params = params::flatten(&bag.params())?;
    job_params.extend(derived_switches(bag)?);

    let sheet_extension: Option<String> = option(bag, keys::SHEET_EXTENSION)?;
    let data_extension: Option<String> = option(bag, keys::DATA_EXTENSION)?;
    let stem = output_path.join("/");
    let sheet = format!(
        "{}.{}",
        stem,
        sheet_extension.as_deref().unwrap_or(&defaults.sheet_extension)
    );
    let data = format!(
        "{}.{}",
        stem,
        data_extension.as_deref().unwrap_or(&defaults.data_extension)
    );

    let files = expand_patterns(base_dir, &patterns)?;
    debug!("{}: {} input file(s)", sheet, files.len());

    Ok(Some(Job {
        params: job_params,
        files,
        sheet,
        data,
    }))
}

/// Switches derived from boolean options, appended after flattening
fn derived_switches(bag: &OptionBag) -> PackResult<Vec<String>> {
    let mut switches = Vec::new();

    let rotation: Option<bool> = option(bag, keys::ROTATION)?;
    if rotation.unwrap_or(false) {
        switches.push("--enable-rotation".to_string());
    } else {
        switches.push("--disable-rotation".to_string());
    }

    // `auto_alias: true` has always meant "pass --disable-auto-alias"
    let auto_alias: Option<bool> = option(bag, keys::AUTO_ALIAS)?;
    if auto_alias.unwrap_or(false) {
        switches.push("--disable-auto-alias".to_string());
    }

    let identical: Option<bool> = option(bag, keys::FORCE_IDENTICAL_LAYOUT)?;
    if identical.unwrap_or(false) {
        switches.push("--force-identical-layout".to_string());
    }

    Ok(switches)
}

/// Read a typed option; `null` counts as absent
fn option<T: DeserializeOwned>(bag: &OptionBag, key: &str) -> PackResult<Option<T>> {
    match bag.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value).map(Some).map_err(|e| {
            PackError::InvalidConfiguration(format!("option '{}': {}", key, e))
        }),
    }
}

/// Expand each pattern under `base_dir`, keeping pattern order.
///
/// Matches are concatenated without deduplication; directories are skipped.
fn expand_patterns(base_dir: &Path, patterns: &[Vec<String>]) -> PackResult<Vec<PathBuf>> {
    let base = PathBuf::from(Pattern::escape(&base_dir.to_string_lossy()));
    let mut files = Vec::new();

    for segments in patterns {
        let pattern = segments.iter().fold(base.clone(), |path, s| path.join(s));
        let pattern = pattern.to_string_lossy();

        let matches = glob::glob(&pattern).map_err(|e| {
            PackError::InvalidConfiguration(format!("invalid pattern '{}': {}", pattern, e))
        })?;

        for entry in matches {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(path) => debug!("Skipping non-file match {}", path.display()),
                Err(e) => warn!("Unreadable match for '{}': {}", pattern, e),
            }
        }
    }

    Ok(files)
}
