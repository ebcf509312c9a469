//! On-disk result cache for branch PR scans
//!
//! Maps `{owner}/{repo}:{branch}@{head-hash}` to the ordered PR numbers last
//! seen on that branch, so an unchanged branch head skips a live fetch. The
//! cache is a best-effort convenience: corruption resets it, and callers are
//! expected to treat write failures as warnings, not errors.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{Error, Result};

const CACHE_DIR: &str = "peddi-tooling";
const CACHE_FILE: &str = "prs_cache.json";

type CacheData = BTreeMap<String, Vec<u64>>;

/// Single-file JSON cache of branch PR snapshots.
///
/// Holds at most one snapshot per `{owner}/{repo}:{branch}`; a `put` with a
/// new head hash purges older entries for that branch. Assumes single-process
/// access: the file is read fully on open and rewritten fully on every put.
#[derive(Debug)]
pub struct PrCache {
    path: PathBuf,
    entries: CacheData,
}

impl PrCache {
    /// Open the cache at the platform cache directory
    /// (`<cache-dir>/peddi-tooling/prs_cache.json`), creating the directory
    /// if needed.
    pub fn open_default() -> Result<Self> {
        let base = dirs::cache_dir()
            .ok_or_else(|| Error::Cache("could not determine the user cache directory".into()))?;
        let dir = base.join(CACHE_DIR);
        fs::create_dir_all(&dir)?;
        Self::open(dir.join(CACHE_FILE))
    }

    /// Open a cache file. A missing file is an empty cache; an unparseable
    /// one is discarded wholesale and logged.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(content) => match serde_json::from_slice(&content) {
                Ok(data) => data,
                Err(err) => {
                    warn!(path = %path.display(), %err, "discarding unreadable cache file");
                    CacheData::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheData::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(PrCache { path, entries })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// PR numbers cached for this exact branch head, if any.
    pub fn get(&self, owner: &str, repo: &str, branch: &str, hash: &str) -> Option<&[u64]> {
        self.entries
            .get(&cache_key(owner, repo, branch, hash))
            .map(Vec::as_slice)
    }

    /// Store the snapshot for a branch head, purging every older snapshot of
    /// the same branch, and rewrite the file.
    pub fn put(
        &mut self,
        owner: &str,
        repo: &str,
        branch: &str,
        hash: &str,
        numbers: Vec<u64>,
    ) -> Result<()> {
        let prefix = branch_prefix(owner, repo, branch);
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        self.entries.insert(cache_key(owner, repo, branch, hash), numbers);
        self.save()
    }

    fn save(&self) -> Result<()> {
        let content = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

fn cache_key(owner: &str, repo: &str, branch: &str, hash: &str) -> String {
    format!("{owner}/{repo}:{branch}@{hash}")
}

fn branch_prefix(owner: &str, repo: &str, branch: &str) -> String {
    format!("{owner}/{repo}:{branch}@")
}
