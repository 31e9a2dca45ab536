//! Wire format between the pack client and the execution service
//!
//! Request: gzip-compressed JSON `{params, sheet, data, files}` where each
//! file is `{name, data}` with base64 content. Files are sorted by name so
//! that identical jobs always serialize to identical bytes.
//!
//! Response: JSON `{result, error}`. `result` is the base64 archive of the
//! produced files; a non-empty `error` marks a failed execution.

use crate::error::{PackError, PackResult};
use crate::plan::Job;
use crate::protocol::archive::safe_relative_path;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// One transmitted input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFile {
    /// Basename of the file
    pub name: String,

    /// File contents (base64 on the wire)
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl InputFile {
    /// Read a file, keeping only its basename
    pub async fn load(path: &Path) -> PackResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| PackError::InvalidConfiguration(format!(
                "input {} has no file name",
                path.display()
            )))?;
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| PackError::io(format!("reading input {}", path.display()), e))?;
        Ok(Self { name, data })
    }
}

/// Read every input concurrently, sorted by name.
///
/// Completion order does not matter: the result is always sorted.
pub async fn load_inputs(paths: &[PathBuf]) -> PackResult<Vec<InputFile>> {
    let mut files = try_join_all(paths.iter().map(|path| InputFile::load(path))).await?;
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Request body sent to the execution service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackRequest {
    pub params: Vec<String>,
    pub sheet: String,
    pub data: String,
    pub files: Vec<InputFile>,
}

impl PackRequest {
    /// Build the request for a job from its loaded inputs
    pub fn new(job: &Job, mut files: Vec<InputFile>) -> Self {
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            params: job.params.clone(),
            sheet: job.sheet.clone(),
            data: job.data.clone(),
            files,
        }
    }

    /// Serialize to JSON and gzip it
    pub fn encode(&self) -> PackResult<Vec<u8>> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder
            .write_all(&json)
            .map_err(|e| PackError::io("compressing request", e))?;
        encoder
            .finish()
            .map_err(|e| PackError::io("compressing request", e))
    }

    /// Parse a request body, gunzipping it first when `gzipped`
    pub fn decode(body: &[u8], gzipped: bool) -> PackResult<Self> {
        let mut json = Vec::new();
        let json = if gzipped {
            GzDecoder::new(body)
                .read_to_end(&mut json)
                .map_err(|e| PackError::MalformedRequest(format!("bad gzip body: {}", e)))?;
            json.as_slice()
        } else {
            body
        };

        let request: Self = serde_json::from_slice(json)
            .map_err(|e| PackError::MalformedRequest(e.to_string()))?;

        request.validate()?;
        Ok(request)
    }

    /// Reject names that could escape the service's scratch area.
    ///
    /// Repeated input names are allowed: glob expansion keeps duplicates,
    /// and the packer receives one path per transmitted entry.
    pub fn validate(&self) -> PackResult<()> {
        for target in [&self.sheet, &self.data] {
            if safe_relative_path(target).is_none() {
                return Err(PackError::MalformedRequest(format!(
                    "output name '{}' must be a relative path",
                    target
                )));
            }
        }

        for file in &self.files {
            if !is_plain_name(&file.name) {
                return Err(PackError::MalformedRequest(format!(
                    "input name '{}' must be a plain file name",
                    file.name
                )));
            }
        }
        Ok(())
    }
}

/// A single path component other than `.` or `..`
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Response envelope returned by the execution service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PackResponse {
    /// Successful response carrying archive bytes
    pub fn success(archive: &[u8]) -> Self {
        Self {
            result: Some(BASE64_STANDARD.encode(archive)),
            error: None,
        }
    }

    /// Failed response carrying a message
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }

    /// Archive bytes, or the failure the service reported
    pub fn into_archive(self) -> PackResult<Vec<u8>> {
        if let Some(error) = self.error.filter(|e| !e.is_empty()) {
            return Err(PackError::Remote(error));
        }
        let result = self
            .result
            .ok_or_else(|| PackError::Archive("response has no result".to_string()))?;
        BASE64_STANDARD
            .decode(result.as_bytes())
            .map_err(|e| PackError::Archive(format!("result is not base64: {}", e)))
    }
}

mod base64_bytes {
    use base64::prelude::{Engine as _, BASE64_STANDARD};
    use serde::de::Error;
    use serde::Deserialize;

    pub fn serialize<S: serde::Serializer>(
        bytes: &Vec<u8>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(s.as_bytes())
            .map_err(D::Error::custom)
    }
}
