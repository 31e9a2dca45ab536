//! Persistent output cache
//!
//! One JSON document maps each job fingerprint to the outputs that job
//! produced last time, with their content hashes. A job is up to date only
//! if every recorded output still exists with the recorded hash.
//!
//! Concurrent jobs share one `ContentCache`. Every mutation re-reads the
//! whole document, merges one record and writes it back (temp file +
//! rename) while holding the cache's lock, so jobs with different
//! fingerprints never lose each other's updates.

use crate::cache::fingerprint::{digest, digest_file, Fingerprint};
use crate::error::{PackError, PackResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// One recorded output file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Path relative to the output root
    pub name: String,

    /// SHA256 of the file contents
    pub hash: String,
}

/// The persisted document: fingerprint -> recorded outputs
pub type CacheDocument = BTreeMap<String, Vec<CacheEntry>>;

/// Shared owner of the cache document
#[derive(Debug)]
pub struct ContentCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ContentCache {
    /// Create a cache backed by the document at `path`
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Recorded outputs for a fingerprint, if any
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Vec<CacheEntry>> {
        let _guard = self.lock.lock().await;
        self.read_document().await.remove(fingerprint.as_str())
    }

    /// Whether the job with this fingerprint has to run.
    ///
    /// True when nothing is recorded, or when any recorded output under
    /// `output_root` is missing or has changed.
    pub async fn needs_rebuild(&self, fingerprint: &Fingerprint, output_root: &Path) -> bool {
        let Some(entries) = self.get(fingerprint).await else {
            debug!("{}: no cache record", fingerprint.short());
            return true;
        };

        for entry in &entries {
            let path = output_root.join(&entry.name);
            match digest_file(&path).await {
                Some(hash) if hash == entry.hash => {}
                Some(_) => {
                    debug!("{}: {} changed", fingerprint.short(), entry.name);
                    return true;
                }
                None => {
                    debug!("{}: {} missing", fingerprint.short(), entry.name);
                    return true;
                }
            }
        }

        false
    }

    /// Record the outputs a job produced, replacing any earlier record.
    ///
    /// `produced` holds paths relative to `output_root`. An empty list is
    /// not recorded, since it would mark the job up to date forever.
    pub async fn store(
        &self,
        fingerprint: &Fingerprint,
        output_root: &Path,
        produced: &[String],
    ) -> PackResult<()> {
        if produced.is_empty() {
            warn!(
                "{}: job produced no files, not caching",
                fingerprint.short()
            );
            return Ok(());
        }

        let mut entries = Vec::with_capacity(produced.len());
        for name in produced {
            let path = output_root.join(name);
            let bytes = fs::read(&path)
                .await
                .map_err(|e| PackError::io(format!("reading output {}", path.display()), e))?;
            entries.push(CacheEntry {
                name: name.clone(),
                hash: digest(&bytes),
            });
        }

        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await;
        document.insert(fingerprint.to_string(), entries);
        self.write_document(&document).await?;

        debug!("{}: cached {} output(s)", fingerprint.short(), produced.len());
        Ok(())
    }

    /// Snapshot of the whole document
    pub async fn entries(&self) -> CacheDocument {
        let _guard = self.lock.lock().await;
        self.read_document().await
    }

    /// Remove every record, returning how many there were
    pub async fn clear(&self) -> PackResult<usize> {
        let _guard = self.lock.lock().await;
        let count = self.read_document().await.len();
        if self.path.exists() {
            fs::remove_file(&self.path).await.map_err(|e| {
                PackError::io(format!("removing cache {}", self.path.display()), e)
            })?;
        }
        Ok(count)
    }

    /// Read the document; a missing or corrupt file is an empty cache
    async fn read_document(&self) -> CacheDocument {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(_) => return CacheDocument::new(),
        };

        match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                warn!(
                    "Ignoring unreadable cache {}: {}",
                    self.path.display(),
                    e
                );
                CacheDocument::new()
            }
        }
    }

    async fn write_document(&self, document: &CacheDocument) -> PackResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    PackError::io(format!("creating cache directory {}", parent.display()), e)
                })?;
            }
        }

        let content = serde_json::to_string_pretty(document)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| PackError::io(format!("writing cache {}", tmp.display()), e))?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| PackError::io(format!("replacing cache {}", self.path.display()), e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn test_cache(dir: &TempDir) -> ContentCache {
        ContentCache::new(dir.path().join("cache").join(".pack_cache.json"))
    }

    fn fingerprint(tag: &str) -> Fingerprint {
        Fingerprint::from(digest(tag.as_bytes()))
    }

    fn outputs(dir: &Path) -> Vec<String> {
        std::fs::create_dir_all(dir.join("atlas")).unwrap();
        std::fs::write(dir.join("atlas/ui.pvr.ccz"), b"sheet").unwrap();
        std::fs::write(dir.join("atlas/ui.plist"), b"data").unwrap();
        vec!["atlas/ui.pvr.ccz".to_string(), "atlas/ui.plist".to_string()]
    }

    #[tokio::test]
    async fn unknown_fingerprint_needs_rebuild() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        assert!(cache.needs_rebuild(&fingerprint("job"), temp.path()).await);
    }

    #[tokio::test]
    async fn stored_outputs_are_up_to_date() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        let out = temp.path().join("out");
        let produced = outputs(&out);

        cache.store(&fingerprint("job"), &out, &produced).await.unwrap();

        assert!(!cache.needs_rebuild(&fingerprint("job"), &out).await);
        let entries = cache.get(&fingerprint("job")).await.unwrap();
        assert_eq!(entries[0].name, "atlas/ui.pvr.ccz");
        assert_eq!(entries[0].hash, digest(b"sheet"));
    }

    #[tokio::test]
    async fn changed_output_needs_rebuild() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        let out = temp.path().join("out");
        let produced = outputs(&out);
        cache.store(&fingerprint("job"), &out, &produced).await.unwrap();

        // Only the second of two outputs changes
        std::fs::write(out.join("atlas/ui.plist"), b"edited").unwrap();

        assert!(cache.needs_rebuild(&fingerprint("job"), &out).await);
    }

    #[tokio::test]
    async fn deleted_output_needs_rebuild() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        let out = temp.path().join("out");
        let produced = outputs(&out);
        cache.store(&fingerprint("job"), &out, &produced).await.unwrap();

        std::fs::remove_file(out.join("atlas/ui.pvr.ccz")).unwrap();

        assert!(cache.needs_rebuild(&fingerprint("job"), &out).await);
    }

    #[tokio::test]
    async fn corrupt_document_is_empty_cache() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        std::fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        std::fs::write(cache.path(), "{ truncated").unwrap();

        assert!(cache.entries().await.is_empty());
        assert!(cache.needs_rebuild(&fingerprint("job"), temp.path()).await);

        // Storing over a corrupt document replaces it
        let out = temp.path().join("out");
        let produced = outputs(&out);
        cache.store(&fingerprint("job"), &out, &produced).await.unwrap();
        assert_eq!(cache.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_stores_keep_every_record() {
        let temp = TempDir::new().unwrap();
        let cache = Arc::new(test_cache(&temp));
        let out = temp.path().join("out");
        let produced = outputs(&out);

        let stores = (0..16).map(|i| {
            let cache = Arc::clone(&cache);
            let out = out.clone();
            let produced = produced.clone();
            async move {
                cache
                    .store(&fingerprint(&format!("job-{}", i)), &out, &produced)
                    .await
            }
        });
        for result in futures_util::future::join_all(stores).await {
            result.unwrap();
        }

        assert_eq!(cache.entries().await.len(), 16);
    }

    #[tokio::test]
    async fn empty_output_list_is_not_recorded() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        cache.store(&fingerprint("job"), temp.path(), &[]).await.unwrap();
        assert!(cache.get(&fingerprint("job")).await.is_none());
    }

    #[tokio::test]
    async fn clear_removes_records() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(&temp);
        let out = temp.path().join("out");
        let produced = outputs(&out);
        cache.store(&fingerprint("a"), &out, &produced).await.unwrap();
        cache.store(&fingerprint("b"), &out, &produced).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.entries().await.is_empty());
    }
}
