//! In-memory archives of produced files
//!
//! An archive maps `/`-separated relative paths to file contents. It only
//! exists to move a batch of outputs across the network: the service packs
//! its output directory into one, the client extracts it under its output
//! root. On the wire it is a gzip-compressed tar of regular files.

use crate::error::{PackError, PackResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use futures_util::future::try_join_all;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Relative path -> contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    entries: BTreeMap<String, Vec<u8>>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; the name must be a relative path that stays inside
    /// the extraction root
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) -> PackResult<()> {
        let name = name.into();
        if safe_relative_path(&name).is_none() {
            return Err(PackError::Archive(format!(
                "entry '{}' escapes the output directory",
                name
            )));
        }
        self.entries.insert(name, data);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Entry names, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode as a gzip-compressed tar
    pub fn to_bytes(&self) -> PackResult<Vec<u8>> {
        let encoder = GzEncoder::new(Vec::new(), Compression::best());
        let mut builder = tar::Builder::new(encoder);

        for (name, data) in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Regular);
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            builder
                .append_data(&mut header, name, data.as_slice())
                .map_err(|e| PackError::Archive(format!("adding {}: {}", name, e)))?;
        }

        builder
            .into_inner()
            .and_then(GzEncoder::finish)
            .map_err(|e| PackError::Archive(format!("finishing archive: {}", e)))
    }

    /// Decode a gzip-compressed tar. Directory entries are skipped; any
    /// other non-file entry, or a path escaping the root, is an error.
    pub fn from_bytes(bytes: &[u8]) -> PackResult<Self> {
        let mut tar = tar::Archive::new(GzDecoder::new(bytes));
        let entries = tar
            .entries()
            .map_err(|e| PackError::Archive(e.to_string()))?;

        let mut archive = Self::new();
        for entry in entries {
            let mut entry = entry.map_err(|e| PackError::Archive(e.to_string()))?;
            let entry_type = entry.header().entry_type();
            if entry_type.is_dir() {
                continue;
            }
            if !entry_type.is_file() {
                return Err(PackError::Archive(format!(
                    "unsupported entry type {:?}",
                    entry_type
                )));
            }

            let name = entry
                .path()
                .map_err(|e| PackError::Archive(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            // The declared size comes from the peer; it is checked against
            // what was actually read, never used to allocate
            let declared = entry.size();
            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| PackError::Archive(format!("reading {}: {}", name, e)))?;
            if data.len() as u64 != declared {
                return Err(PackError::Archive(format!(
                    "entry {} is truncated: header declares {} bytes, found {}",
                    name,
                    declared,
                    data.len()
                )));
            }
            archive.insert(name, data)?;
        }

        Ok(archive)
    }

    /// Collect every file under `dir`, keyed by path relative to it
    pub async fn from_dir(dir: &Path) -> PackResult<Self> {
        let mut archive = Self::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries = fs::read_dir(&current)
                .await
                .map_err(|e| PackError::io(format!("reading directory {}", current.display()), e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| PackError::io(format!("reading entry in {}", current.display()), e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| PackError::io(format!("inspecting {}", path.display()), e))?;

                if file_type.is_dir() {
                    pending.push(path);
                    continue;
                }
                if !file_type.is_file() {
                    debug!("Skipping non-file output {}", path.display());
                    continue;
                }

                let name = relative_name(dir, &path)?;
                let data = fs::read(&path)
                    .await
                    .map_err(|e| PackError::io(format!("reading output {}", path.display()), e))?;
                archive.insert(name, data)?;
            }
        }

        Ok(archive)
    }

    /// Write every entry under `root`, creating parent directories.
    ///
    /// Writes run concurrently. Returns the entry names.
    pub async fn extract_to(&self, root: &Path) -> PackResult<Vec<String>> {
        let writes = self.entries.iter().map(|(name, data)| async move {
            let relative = safe_relative_path(name).ok_or_else(|| {
                PackError::Archive(format!("entry '{}' escapes the output directory", name))
            })?;
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PackError::io(format!("creating directory {}", parent.display()), e)
                })?;
            }
            fs::write(&path, data)
                .await
                .map_err(|e| PackError::io(format!("writing {}", path.display()), e))?;
            debug!("Extracted {}", path.display());
            Ok::<_, PackError>(())
        });

        try_join_all(writes).await?;
        Ok(self.names())
    }
}

/// Parse a `/`-separated relative path that cannot leave its root
pub fn safe_relative_path(name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains('\0') || name.contains('\\') {
        return None;
    }

    let path = Path::new(name);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn relative_name(root: &Path, path: &Path) -> PackResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| PackError::Internal(format!("{} is outside {}", path.display(), root.display())))?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
