//! Packer tool invocation
//!
//! The packer is an opaque executable driven by its command line:
//! `<program> <params...> --sheet <path> --data <path> <inputs...>`.
//! Exit code 0 means success; anything else fails the job.

use crate::error::{PackError, PackResult};
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::debug;

/// Longest stderr excerpt carried in an error
const STDERR_EXCERPT: usize = 2000;

/// The external packer executable
#[derive(Debug, Clone)]
pub struct PackerTool {
    program: String,
}

impl PackerTool {
    /// Create a tool handle for `program` (a name on PATH or a path)
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the packer, in order
    pub fn arguments(
        params: &[String],
        sheet: &Path,
        data: &Path,
        inputs: &[PathBuf],
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = params.iter().map(OsString::from).collect();
        args.push("--sheet".into());
        args.push(sheet.into());
        args.push("--data".into());
        args.push(data.into());
        args.extend(inputs.iter().map(OsString::from));
        args
    }

    /// Run the packer for one job.
    ///
    /// Parent directories of `sheet` and `data` are created first.
    /// `label` names the job in errors.
    pub async fn run(
        &self,
        label: &str,
        params: &[String],
        sheet: &Path,
        data: &Path,
        inputs: &[PathBuf],
    ) -> PackResult<()> {
        for target in [sheet, data] {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PackError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
        }

        let args = Self::arguments(params, sheet, data, inputs);
        debug!("Executing: {} {:?}", self.program, args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => PackError::ToolNotFound {
                    program: self.program.clone(),
                    source: e,
                },
                _ => PackError::io(format!("spawning {}", self.program), e),
            })?;

        if output.status.success() {
            debug!("{}: packer finished", label);
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let excerpt = match stderr.char_indices().nth(STDERR_EXCERPT) {
            Some((cut, _)) => &stderr[..cut],
            None => stderr,
        };
        Err(PackError::ToolInvocation {
            sheet: label.to_string(),
            code: output.status.code(),
            stderr: excerpt.to_string(),
        })
    }
}

/// Stand-in packer scripts for tests
#[cfg(all(test, unix))]
pub(crate) mod testing {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    /// Script that writes fixed content to `--sheet` and `--data` and
    /// records its arguments next to itself (`<script>.args`)
    pub fn fake_packer(dir: &Path) -> PathBuf {
        write_script(
            dir,
            "fake-packer",
            r#"#!/bin/sh
printf '%s\n' "$@" > "$0.args"
sheet=""
data=""
while [ $# -gt 0 ]; do
  case "$1" in
    --sheet) sheet="$2"; shift 2 ;;
    --data) data="$2"; shift 2 ;;
    *) shift ;;
  esac
done
mkdir -p "$(dirname "$sheet")" "$(dirname "$data")"
printf 'sheet' > "$sheet"
printf 'data' > "$data"
"#,
        )
    }

    /// Script that always fails with exit code 3
    pub fn failing_packer(dir: &Path) -> PathBuf {
        write_script(
            dir,
            "failing-packer",
            "#!/bin/sh\necho 'cannot read image' >&2\nexit 3\n",
        )
    }

    fn write_script(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
