//! Discovery tests over real directory trees.
//!
//! Each test builds an isolated `TempDir`; there is no shared state.

use std::fs;
use std::path::{Path, PathBuf};

use stamp_core::{Config, DEFAULT_CONFIG_FILE};
use stamp_discovery::{apply_renames, discover, matcher_renames, DiscoveryError, TemplateFile};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn touch(root: &Path, rel: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("mkdir");
    }
    fs::write(path, "x").expect("write fixture");
}

fn config_at(root: &Path) -> Config {
    Config {
        path: root.join(DEFAULT_CONFIG_FILE),
        ..Config::default()
    }
}

fn rel_outputs(found: &[TemplateFile]) -> Vec<PathBuf> {
    found.iter().map(|t| t.rel_output.clone()).collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn finds_nested_templates_sorted() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "z.stamp.txt");
    touch(dir.path(), "a/b/config.stamp.toml");
    touch(dir.path(), "a/Dockerfile.stamp");
    touch(dir.path(), "a/plain.txt");

    let found = discover(dir.path(), &config_at(dir.path())).unwrap();
    assert_eq!(
        rel_outputs(&found),
        vec![
            PathBuf::from("a/Dockerfile"),
            PathBuf::from("a/b/config.toml"),
            PathBuf::from("z.txt"),
        ]
    );
    assert_eq!(found[2].source_path, dir.path().join("z.stamp.txt"));
    assert_eq!(found[2].output_path, dir.path().join("z.txt"));
    assert!(found.iter().all(|t| t.matcher == "stamp"));
}

#[test]
fn excluded_directories_are_pruned() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "node_modules/pkg/x.stamp.json");
    touch(dir.path(), "keep.stamp.json");

    let mut config = config_at(dir.path());
    config.exclude = vec!["node_modules/".to_string()];
    let found = discover(dir.path(), &config).unwrap();
    assert_eq!(rel_outputs(&found), vec![PathBuf::from("keep.json")]);
}

#[test]
fn negated_exclude_reincludes_file() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "one.stamp.md");
    touch(dir.path(), "two.stamp.md");

    let mut config = config_at(dir.path());
    config.exclude = vec!["*.stamp.md".to_string(), "!two.stamp.md".to_string()];
    let found = discover(dir.path(), &config).unwrap();
    assert_eq!(rel_outputs(&found), vec![PathBuf::from("two.md")]);
}

#[test]
fn gitignore_file_is_honoured() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "build/out.stamp.txt");
    touch(dir.path(), "src.stamp.txt");
    let gitignore = dir.path().join(".gitignore");
    fs::write(&gitignore, "build\n").unwrap();

    let mut config = config_at(dir.path());
    config.ignore_files = vec![gitignore];
    let found = discover(dir.path(), &config).unwrap();
    assert_eq!(rel_outputs(&found), vec![PathBuf::from("src.txt")]);
}

#[test]
fn config_file_is_never_a_template() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "settings.stamp");

    let config = Config {
        path: dir.path().join("settings.stamp"),
        ..Config::default()
    };
    let found = discover(dir.path(), &config).unwrap();
    assert!(found.is_empty());
}

#[test]
fn custom_matchers_in_order() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.tpl.txt");
    touch(dir.path(), "b.stamp.txt");

    let mut config = config_at(dir.path());
    config.matchers = vec!["tpl".to_string()];
    let found = discover(dir.path(), &config).unwrap();
    assert_eq!(rel_outputs(&found), vec![PathBuf::from("a.txt")]);
    assert_eq!(found[0].matcher, "tpl");
}

#[test]
fn missing_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = discover(&missing, &config_at(&missing)).unwrap_err();
    assert!(matches!(err, DiscoveryError::RootNotFound { .. }));
}

#[test]
fn file_root_is_an_error() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "file.txt");
    let file = dir.path().join("file.txt");
    let err = discover(&file, &config_at(dir.path())).unwrap_err();
    assert!(matches!(err, DiscoveryError::RootNotDirectory { .. }));
}

#[test]
fn templates_sharing_an_output_are_rejected() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.stamp.txt");
    touch(dir.path(), "a.txt.stamp");

    let err = discover(dir.path(), &config_at(dir.path())).unwrap_err();
    match err {
        DiscoveryError::DuplicateOutput {
            output,
            first,
            second,
        } => {
            assert_eq!(output, PathBuf::from("a.txt"));
            assert_eq!(first, PathBuf::from("a.stamp.txt"));
            assert_eq!(second, PathBuf::from("a.txt.stamp"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Matcher renames
// ---------------------------------------------------------------------------

#[test]
fn renames_templates_of_the_old_matcher_only() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.ree.txt");
    touch(dir.path(), "nested/Dockerfile.ree");
    touch(dir.path(), "b.stamp.txt");
    touch(dir.path(), "c.reeree.txt");
    touch(dir.path(), "node_modules/x.ree.txt");
    let config = Config {
        exclude: vec!["node_modules/".to_string()],
        ..config_at(dir.path())
    };

    let renames = matcher_renames(dir.path(), &config, "ree", "roo").unwrap();
    let planned: Vec<_> = renames
        .iter()
        .map(|r| r.to.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        planned,
        vec![PathBuf::from("a.roo.txt"), PathBuf::from("nested/Dockerfile.roo")]
    );
    assert!(dir.path().join("a.ree.txt").exists(), "planning renames nothing");

    apply_renames(&renames).unwrap();
    assert!(!dir.path().join("a.ree.txt").exists());
    assert!(dir.path().join("a.roo.txt").exists());
    assert!(dir.path().join("nested/Dockerfile.roo").exists());
    assert!(dir.path().join("b.stamp.txt").exists());
    assert!(dir.path().join("c.reeree.txt").exists());
    assert!(dir.path().join("node_modules/x.ree.txt").exists());
}

#[test]
fn rename_refuses_to_overwrite() {
    let dir = TempDir::new().unwrap();
    touch(dir.path(), "a.ree.txt");
    touch(dir.path(), "a.roo.txt");

    let err = matcher_renames(dir.path(), &config_at(dir.path()), "ree", "roo").unwrap_err();
    assert!(matches!(err, DiscoveryError::RenameTargetExists { .. }), "{err}");
}

#[test]
fn rename_rejects_an_invalid_new_matcher() {
    let dir = TempDir::new().unwrap();
    let err = matcher_renames(dir.path(), &config_at(dir.path()), "stamp", "Bad.One").unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidMatcher { .. }), "{err}");
}
