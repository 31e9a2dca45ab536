//! Job fingerprinting for content-addressed caching
//!
//! A fingerprint covers everything that influences a job's outputs: its
//! parameters, its output names and the name and content of every input.
//! Same effective job = same fingerprint, whichever tree node it came from.

use crate::error::PackResult;
use crate::plan::Job;
use crate::protocol::wire::InputFile;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;

/// Cache key identifying a job's effective inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a job from its loaded inputs
    pub fn compute(job: &Job, inputs: &[InputFile]) -> PackResult<Self> {
        let mut files: Vec<FileDigest<'_>> = inputs
            .iter()
            .map(|file| FileDigest {
                name: &file.name,
                hash: digest(&file.data),
            })
            .collect();
        files.sort_by(|a, b| a.name.cmp(b.name).then_with(|| a.hash.cmp(&b.hash)));

        let canonical = Canonical {
            params: &job.params,
            sheet: &job.sheet,
            data: &job.data,
            files,
        };
        let serialized = serde_json::to_vec(&canonical)?;
        Ok(Self(digest(&serialized)))
    }

    /// Hex digest string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl From<String> for Fingerprint {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct Canonical<'a> {
    params: &'a [String],
    sheet: &'a str,
    data: &'a str,
    files: Vec<FileDigest<'a>>,
}

#[derive(Serialize)]
struct FileDigest<'a> {
    name: &'a str,
    hash: String,
}

/// SHA256 of some bytes, as lowercase hex
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA256 of a file's contents, or `None` if it cannot be read
pub async fn digest_file(path: &Path) -> Option<String> {
    tokio::fs::read(path).await.ok().map(|bytes| digest(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(params: &[&str]) -> Job {
        Job {
            params: params.iter().map(|s| s.to_string()).collect(),
            files: vec![PathBuf::from("a/x.png"), PathBuf::from("b/y.png")],
            sheet: "ui.pvr.ccz".to_string(),
            data: "ui.plist".to_string(),
        }
    }

    fn input(name: &str, data: &[u8]) -> InputFile {
        InputFile {
            name: name.to_string(),
            data: data.to_vec(),
        }
    }

    #[test]
    fn digest_is_sha256_hex() {
        assert_eq!(
            digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn fingerprint_ignores_input_order_and_location() {
        let job_a = job(&["--format", "cocos2d"]);
        let mut job_b = job(&["--format", "cocos2d"]);
        job_b.files = vec![PathBuf::from("other/y.png"), PathBuf::from("x.png")];

        let a = Fingerprint::compute(&job_a, &[input("x.png", b"1"), input("y.png", b"2")]).unwrap();
        let b = Fingerprint::compute(&job_b, &[input("y.png", b"2"), input("x.png", b"1")]).unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn differently_shaped_trees_share_a_fingerprint() {
        use crate::plan::{plan, JobDefaults, OptionNode};
        use crate::protocol::load_inputs;
        use serde_json::json;

        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("x.png"), b"x").unwrap();
        std::fs::write(temp.path().join("y.png"), b"y").unwrap();

        let nested = json!({
            "options": { "params": ["--format", "json"] },
            "children": [{
                "options": { "params": ["--format", "cocos2d"] },
                "children": [{
                    "options": { "input_files": [["x.png"], ["y.png"]], "output_path": ["ui"] }
                }]
            }]
        });
        let split = json!({
            "options": { "params": ["--format", "cocos2d"], "output_path": ["ui"] },
            "children": [{ "options": { "input_files": [["y.png"], ["x.png"]] } }]
        });
        let flat = json!({
            "options": {
                "params": ["--format", "cocos2d"],
                "input_files": [["*.png"]],
                "output_path": ["ui"]
            }
        });

        let mut fingerprints = Vec::new();
        for tree in [nested, split, flat] {
            let root: OptionNode = serde_json::from_value(tree).unwrap();
            let planned = plan(&root, temp.path(), &JobDefaults::default());
            assert_eq!(planned.jobs.len(), 1);
            let job = &planned.jobs[0];
            let inputs = load_inputs(&job.files).await.unwrap();
            fingerprints.push(Fingerprint::compute(job, &inputs).unwrap());
        }

        assert_eq!(fingerprints[0], fingerprints[1]);
        assert_eq!(fingerprints[1], fingerprints[2]);
    }

    #[test]
    fn fingerprint_tracks_content() {
        let job = job(&[]);
        let a = Fingerprint::compute(&job, &[input("x.png", b"pixels")]).unwrap();
        let b = Fingerprint::compute(&job, &[input("x.png", b"pixelz")]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_tracks_params_and_outputs() {
        let inputs = [input("x.png", b"1")];
        let base = Fingerprint::compute(&job(&["--scale", "1"]), &inputs).unwrap();
        let scaled = Fingerprint::compute(&job(&["--scale", "0.5"]), &inputs).unwrap();
        assert_ne!(base, scaled);

        let mut renamed = job(&["--scale", "1"]);
        renamed.sheet = "hud.pvr.ccz".to_string();
        assert_ne!(base, Fingerprint::compute(&renamed, &inputs).unwrap());
    }

    #[test]
    fn short_form() {
        let fp = Fingerprint::from("0123456789abcdef".to_string());
        assert_eq!(fp.short(), "0123456789ab");
        assert_eq!(fp.to_string(), "0123456789abcdef");
    }
}
