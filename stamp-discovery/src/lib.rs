//! Template discovery for `stamp-discovery`.
//!
//! `discover(root, config)` walks the render root, prunes excluded
//! directories, and returns every file whose name classifies as a template,
//! sorted by source path. The lockfile and the config file are never
//! templates even when their names would match, and no two templates may
//! share an output.

pub mod error;
pub mod filter;
pub mod matcher;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use stamp_core::{is_valid_matcher, Config, LOCKFILE_NAME};

use crate::error::io_err;
pub use error::DiscoveryError;
pub use filter::IgnoreFilter;
pub use matcher::{classify, rename_matcher, Match};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A discovered template and the file it renders to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateFile {
    /// Absolute template path.
    pub source_path: PathBuf,
    /// Template path relative to the render root.
    pub rel_source: PathBuf,
    pub matcher: String,
    /// Absolute output path, next to the template.
    pub output_path: PathBuf,
    /// Output path relative to the render root.
    pub rel_output: PathBuf,
}

/// A planned template rename from one matcher to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatcherRename {
    pub from: PathBuf,
    pub to: PathBuf,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check that `root` exists and is a directory.
pub fn check_root(root: &Path) -> Result<(), DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(DiscoveryError::RootNotDirectory {
            path: root.to_path_buf(),
        });
    }
    Ok(())
}

/// Discover every template under `root` using `config`'s matchers and
/// exclusion rules.
pub fn discover(root: &Path, config: &Config) -> Result<Vec<TemplateFile>, DiscoveryError> {
    check_root(root)?;
    discover_with(root, &config.matchers, &config_filter(root, config)?)
}

/// Discover templates with an explicit matcher list and filter.
pub fn discover_with(
    root: &Path,
    matchers: &[String],
    filter: &IgnoreFilter,
) -> Result<Vec<TemplateFile>, DiscoveryError> {
    let templates = walk(root, matchers, filter)?;
    check_unique_outputs(&templates)?;
    Ok(templates)
}

/// Plan renaming every template that uses matcher `old` so it uses `new`.
///
/// `old` does not have to be one of the config's matchers. Fails without
/// touching anything if a new name is already taken.
pub fn matcher_renames(
    root: &Path,
    config: &Config,
    old: &str,
    new: &str,
) -> Result<Vec<MatcherRename>, DiscoveryError> {
    if !is_valid_matcher(new) {
        return Err(DiscoveryError::InvalidMatcher {
            matcher: new.to_string(),
        });
    }
    check_root(root)?;
    if old == new {
        return Ok(Vec::new());
    }

    let filter = config_filter(root, config)?;
    let mut renames = Vec::new();
    for t in walk(root, &[old.to_string()], &filter)? {
        let Some(new_name) = t
            .source_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| rename_matcher(n, old, new))
        else {
            continue;
        };
        let to = t.source_path.with_file_name(new_name);
        if to.exists() {
            return Err(DiscoveryError::RenameTargetExists {
                from: t.source_path,
                to,
            });
        }
        renames.push(MatcherRename {
            from: t.source_path,
            to,
        });
    }
    Ok(renames)
}

/// Carry out renames planned by [`matcher_renames`].
pub fn apply_renames(renames: &[MatcherRename]) -> Result<(), DiscoveryError> {
    for r in renames {
        std::fs::rename(&r.from, &r.to).map_err(|e| io_err(&r.from, e))?;
        tracing::info!("renamed {} -> {}", r.from.display(), r.to.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Walk
// ---------------------------------------------------------------------------

fn config_filter(root: &Path, config: &Config) -> Result<IgnoreFilter, DiscoveryError> {
    Ok(IgnoreFilter::build(root, &config.ignore_files, &config.exclude)?
        .always_exclude(root.join(LOCKFILE_NAME))
        .always_exclude(config.path.clone()))
}

fn walk(
    root: &Path,
    matchers: &[String],
    filter: &IgnoreFilter,
) -> Result<Vec<TemplateFile>, DiscoveryError> {
    check_root(root)?;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !filter.is_excluded(e.path(), e.file_type().is_dir()));

    let mut templates = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            tracing::debug!("skipping non-UTF-8 filename: {}", entry.path().display());
            continue;
        };
        let Some(m) = classify(name, matchers) else {
            continue;
        };

        let source_path = entry.path().to_path_buf();
        let output_path = source_path.with_file_name(&m.output_name);
        let rel_source = source_path
            .strip_prefix(root)
            .unwrap_or(&source_path)
            .to_path_buf();
        let rel_output = output_path
            .strip_prefix(root)
            .unwrap_or(&output_path)
            .to_path_buf();
        tracing::debug!(
            "template {} -> {} (matcher '{}')",
            rel_source.display(),
            rel_output.display(),
            m.matcher
        );
        templates.push(TemplateFile {
            source_path,
            rel_source,
            matcher: m.matcher,
            output_path,
            rel_output,
        });
    }

    templates.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    Ok(templates)
}

fn check_unique_outputs(templates: &[TemplateFile]) -> Result<(), DiscoveryError> {
    let mut seen: BTreeMap<&Path, &Path> = BTreeMap::new();
    for t in templates {
        if let Some(first) = seen.insert(t.rel_output.as_path(), t.rel_source.as_path()) {
            return Err(DiscoveryError::DuplicateOutput {
                output: t.rel_output.clone(),
                first: first.to_path_buf(),
                second: t.rel_source.clone(),
            });
        }
    }
    Ok(())
}
