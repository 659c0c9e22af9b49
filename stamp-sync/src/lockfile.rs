//! Lockfile cache: SHA-256 content hashes of rendered outputs.
//!
//! Persists a [`Lockfile`] JSON document at `<root>/.stamp.lock`. A missing,
//! unreadable-as-JSON or version-mismatched lockfile is never an error; the
//! run simply starts from an empty cache. Writes use the same atomic tmp +
//! rename pattern as rendered outputs, and only happen when the serialized
//! text differs from what was loaded.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use stamp_core::LOCKFILE_NAME;

use crate::error::{io_err, SyncError};
use crate::writer::write_atomic;

/// Version stamped into every lockfile; any other version is discarded.
pub const LOCKFILE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// On-disk lockfile payload. Keys are root-relative output paths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    pub version: String,
    pub files: BTreeMap<String, String>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: LOCKFILE_VERSION.to_string(),
            files: BTreeMap::new(),
        }
    }
}

/// Path to the lockfile for a render root.
pub fn lockfile_path(root: &Path) -> PathBuf {
    root.join(LOCKFILE_NAME)
}

/// Hex SHA-256 of rendered output bytes.
pub fn hash_output(content: &str) -> String {
    let mut h = Sha256::new();
    h.update(content.as_bytes());
    hex::encode(h.finalize())
}

/// The lockfile as loaded at the start of a run, plus this run's updates.
#[derive(Debug)]
pub struct LockCache {
    path: PathBuf,
    loaded_text: Option<String>,
    lock: Lockfile,
    seen: BTreeSet<String>,
}

impl LockCache {
    /// Load the lockfile for `root`. With `force`, previous hashes are
    /// ignored but the loaded text is still used to decide whether the
    /// lockfile needs rewriting.
    pub fn load(root: &Path, force: bool) -> Result<Self, SyncError> {
        let path = lockfile_path(root);
        let loaded_text = match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::warn!("lockfile {} is not UTF-8, starting fresh", path.display());
                Some(String::new())
            }
            Err(e) => return Err(io_err(&path, e)),
        };

        let lock = match &loaded_text {
            _ if force => Lockfile::default(),
            None => Lockfile::default(),
            Some(text) => parse_lockfile(&path, text),
        };
        Ok(Self {
            path,
            loaded_text,
            lock,
            seen: BTreeSet::new(),
        })
    }

    pub fn lockfile(&self) -> &Lockfile {
        &self.lock
    }

    /// `true` when `rel_output` was last written with `hash` and still exists.
    pub fn is_current(&self, rel_output: &str, hash: &str, output_path: &Path) -> bool {
        self.lock.files.get(rel_output).is_some_and(|h| h == hash) && output_path.exists()
    }

    /// Record the hash of an output produced by this run.
    pub fn record(&mut self, rel_output: &str, hash: String) {
        self.seen.insert(rel_output.to_string());
        self.lock.files.insert(rel_output.to_string(), hash);
    }

    /// Drop entries for outputs this run did not produce, then persist the
    /// lockfile if its text changed. Returns whether it was written.
    pub fn finish(mut self) -> Result<bool, SyncError> {
        let seen = std::mem::take(&mut self.seen);
        self.lock.files.retain(|k, _| seen.contains(k));

        let mut text = serde_json::to_string_pretty(&self.lock)?;
        text.push('\n');
        if self.loaded_text.as_deref() == Some(text.as_str()) {
            tracing::debug!("lockfile unchanged");
            return Ok(false);
        }
        write_atomic(&self.path, &text)?;
        tracing::info!("updated lockfile {}", self.path.display());
        Ok(true)
    }
}

fn parse_lockfile(path: &Path, text: &str) -> Lockfile {
    match serde_json::from_str::<Lockfile>(text) {
        Ok(lock) if lock.version == LOCKFILE_VERSION => lock,
        Ok(lock) => {
            tracing::debug!(
                "lockfile version {} does not match {LOCKFILE_VERSION}, starting fresh",
                lock.version
            );
            Lockfile::default()
        }
        Err(e) => {
            tracing::warn!("ignoring malformed lockfile {}: {e}", path.display());
            Lockfile::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn hash_is_sha256_hex() {
        assert_eq!(
            hash_output("hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[rstest]
    #[case("not json at all")]
    #[case("[1, 2, 3]")]
    #[case(r#"{"files": {}}"#)]
    #[case(r#"{"version": "0.0.0-other", "files": {"a": "b"}}"#)]
    fn unusable_lockfile_loads_empty(#[case] contents: &str) {
        let tmp = TempDir::new().unwrap();
        std::fs::write(lockfile_path(tmp.path()), contents).unwrap();
        let cache = LockCache::load(tmp.path(), false).unwrap();
        assert!(cache.lockfile().files.is_empty());
    }

    #[test]
    fn record_persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a.txt");
        std::fs::write(&out, "x").unwrap();

        let mut cache = LockCache::load(tmp.path(), false).unwrap();
        cache.record("a.txt", hash_output("x"));
        assert!(cache.finish().unwrap());

        let cache = LockCache::load(tmp.path(), false).unwrap();
        assert!(cache.is_current("a.txt", &hash_output("x"), &out));
        assert!(!cache.is_current("a.txt", &hash_output("y"), &out));
        assert!(!cache.is_current("b.txt", &hash_output("x"), &tmp.path().join("b.txt")));
    }

    #[test]
    fn deleted_output_is_not_current() {
        let tmp = TempDir::new().unwrap();
        let mut cache = LockCache::load(tmp.path(), false).unwrap();
        cache.record("gone.txt", hash_output("x"));
        cache.finish().unwrap();

        let cache = LockCache::load(tmp.path(), false).unwrap();
        assert!(!cache.is_current("gone.txt", &hash_output("x"), &tmp.path().join("gone.txt")));
    }

    #[test]
    fn unseen_entries_are_dropped_and_keys_sorted() {
        let tmp = TempDir::new().unwrap();
        let mut cache = LockCache::load(tmp.path(), false).unwrap();
        cache.record("z.txt", "1".into());
        cache.record("a.txt", "2".into());
        cache.record("old.txt", "3".into());
        cache.finish().unwrap();

        let mut cache = LockCache::load(tmp.path(), false).unwrap();
        cache.record("z.txt", "1".into());
        cache.record("a.txt", "2".into());
        assert!(cache.finish().unwrap());

        let text = std::fs::read_to_string(lockfile_path(tmp.path())).unwrap();
        let lock: Lockfile = serde_json::from_str(&text).unwrap();
        assert_eq!(lock.files.keys().collect::<Vec<_>>(), ["a.txt", "z.txt"]);
        assert!(text.find("a.txt") < text.find("z.txt"));
    }

    #[test]
    fn identical_lockfile_is_not_rewritten() {
        let tmp = TempDir::new().unwrap();
        let mut cache = LockCache::load(tmp.path(), false).unwrap();
        cache.record("a.txt", "1".into());
        assert!(cache.finish().unwrap());

        let mut cache = LockCache::load(tmp.path(), true).unwrap();
        assert!(cache.lockfile().files.is_empty());
        cache.record("a.txt", "1".into());
        assert!(!cache.finish().unwrap());
    }
}
