//! Atomic file writes.
//!
//! Content goes to `<path>.~stamp-tmp` first and is then renamed over the
//! final path (atomic on POSIX). Parent directories are created as needed.
//! `~` is not a valid matcher character, so a leftover tmp file is never
//! discovered as a template.

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Write `content` to `path` atomically.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), SyncError> {
    write_atomic_with_tmp(path, content, &tmp_path(path))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".~stamp-tmp");
    PathBuf::from(name)
}

fn write_atomic_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }
    tracing::debug!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_parents_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("dir").join("out.txt");
        write_atomic(&path, "hello").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!tmp_path(&path).exists(), "tmp file should be renamed away");
    }

    #[test]
    fn tmp_file_is_never_a_template() {
        let matchers = vec![stamp_core::DEFAULT_MATCHER.to_string()];
        for output in ["out.txt", "nested/Dockerfile", "stamp"] {
            let tmp = tmp_path(Path::new(output));
            let name = tmp.file_name().unwrap().to_str().unwrap();
            assert!(name.ends_with(".~stamp-tmp"), "{name}");
            assert_eq!(stamp_discovery::classify(name, &matchers), None, "{name}");
        }
    }

    #[test]
    fn failed_rename_removes_tmp() {
        let tmp = TempDir::new().unwrap();
        // A non-empty directory at the destination makes the rename fail.
        let dest = tmp.path().join("occupied");
        std::fs::create_dir_all(dest.join("child")).unwrap();
        let tmp_file = tmp_path(&dest);

        let err = write_atomic_with_tmp(&dest, "x", &tmp_file).unwrap_err();
        assert!(matches!(err, SyncError::Io { .. }));
        assert!(!tmp_file.exists());
    }
}
