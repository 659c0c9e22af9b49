//! Gitignore-style exclusion.
//!
//! Patterns from ignore files come first, then inline `exclude` entries, all
//! consolidated into one matcher. The last pattern that matches a path
//! decides: a plain pattern excludes it, a `!pattern` re-includes it.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::DiscoveryError;

/// Compiled exclusion predicate for one render root.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: PathBuf,
    matcher: Gitignore,
    always: Vec<PathBuf>,
}

impl IgnoreFilter {
    /// Build the filter. `ignore_files` are read in order, then `excludes`
    /// are appended as if they were the last lines of one more ignore file.
    pub fn build(
        root: &Path,
        ignore_files: &[PathBuf],
        excludes: &[String],
    ) -> Result<Self, DiscoveryError> {
        let mut builder = GitignoreBuilder::new(root);
        for file in ignore_files {
            if let Some(source) = builder.add(file) {
                return Err(DiscoveryError::Ignore {
                    source_name: file.display().to_string(),
                    source,
                });
            }
        }
        for pattern in excludes {
            builder
                .add_line(None, pattern)
                .map_err(|source| DiscoveryError::Ignore {
                    source_name: "exclude".to_string(),
                    source,
                })?;
        }
        let matcher = builder.build().map_err(|source| DiscoveryError::Ignore {
            source_name: "exclude".to_string(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            matcher,
            always: Vec::new(),
        })
    }

    /// Exclude `path` unconditionally, regardless of any `!` pattern.
    pub fn always_exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.always.push(path.into());
        self
    }

    /// `true` if `path` (absolute, or relative to the root) is excluded,
    /// either directly or through an excluded parent directory.
    pub fn is_excluded(&self, path: &Path, is_dir: bool) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        if rel.as_os_str().is_empty() || rel.has_root() {
            return false;
        }
        if self.always.iter().any(|p| p == rel || self.root.join(rel) == *p) {
            return true;
        }
        self.matcher
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
    }
}
