//! Config file discovery and loading.
//!
//! Loading is a four-step pipeline: read the file, parse TOML, validate the
//! raw document's shape, then deserialize and apply the cross-field checks
//! that need the whole config (matcher format, duplicate keys, paths).

use std::path::{Path, PathBuf};

use crate::error::{io_err, ConfigError};
use crate::types::{is_valid_matcher, Config, DEFAULT_CONFIG_FILE};
use crate::validate::validate_document;

/// Decide which config file a run uses.
///
/// An explicit absolute path is used as is. A relative path, or the default
/// file name when none is given, is tried against the working directory
/// first, then the render root.
pub fn resolve_config_path(root: &Path, explicit: Option<&Path>) -> PathBuf {
    let cwd = std::env::current_dir().ok();
    resolve_config_path_from(cwd.as_deref(), root, explicit)
}

/// [`resolve_config_path`] with the working directory passed in.
pub fn resolve_config_path_from(
    cwd: Option<&Path>,
    root: &Path,
    explicit: Option<&Path>,
) -> PathBuf {
    let rel = match explicit {
        Some(p) if p.is_absolute() => return p.to_path_buf(),
        Some(p) => p,
        None => Path::new(DEFAULT_CONFIG_FILE),
    };
    match cwd.map(|cwd| cwd.join(rel)) {
        Some(candidate) if candidate.exists() => candidate,
        _ => root.join(rel),
    }
}

/// Load and validate the config file at `path`.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let path = path
        .canonicalize()
        .map_err(|e| io_err(path, e))?;
    parse_at(&contents, &path)
}

/// Parse config text as if it had been read from `path`.
///
/// Relative paths inside the config resolve against `path`'s directory.
pub fn parse_at(contents: &str, path: &Path) -> Result<Config, ConfigError> {
    let doc: toml::Table = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_document(&doc)?;

    let mut config: Config =
        Config::deserialize_table(doc).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    config.path = path.to_path_buf();

    check_matchers(&config)?;
    check_unique_keys(&config)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.ignore_files = resolve_existing(base, &config.ignore_files, "ignore_files")?;
    config.engine.custom_extensions = resolve_existing(
        base,
        &config.engine.custom_extensions,
        "engine.custom_extensions",
    )?;

    tracing::debug!(
        "loaded config {} ({} context keys)",
        path.display(),
        config.context.names().len()
    );
    Ok(config)
}

impl Config {
    fn deserialize_table(doc: toml::Table) -> Result<Config, toml::de::Error> {
        use serde::Deserialize;
        Config::deserialize(toml::Value::Table(doc))
    }

    /// Directory holding the config file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }
}

// ---------------------------------------------------------------------------
// Cross-field checks
// ---------------------------------------------------------------------------

fn check_matchers(config: &Config) -> Result<(), ConfigError> {
    if config.matchers.is_empty() {
        return Err(ConfigError::invalid(
            "matchers",
            "at least one matcher is required",
        ));
    }
    for (i, m) in config.matchers.iter().enumerate() {
        if !is_valid_matcher(m) {
            return Err(ConfigError::invalid(
                format!("matchers.{i}"),
                format!("invalid matcher '{m}'; only a-z, 0-9, '_' and '-' are allowed"),
            ));
        }
    }
    Ok(())
}

fn check_unique_keys(config: &Config) -> Result<(), ConfigError> {
    let ctx = &config.context;
    for name in ctx.env.keys() {
        if ctx.statics.contains_key(name) {
            return Err(duplicate("env", name, "static"));
        }
    }
    for name in ctx.cli.keys() {
        if ctx.statics.contains_key(name) {
            return Err(duplicate("cli", name, "static"));
        }
        if ctx.env.contains_key(name) {
            return Err(duplicate("cli", name, "env"));
        }
    }
    Ok(())
}

fn duplicate(kind: &str, name: &str, first: &str) -> ConfigError {
    ConfigError::invalid(
        format!("context.{kind}.{name}"),
        format!("'{name}' is already declared in context.{first}"),
    )
}

fn resolve_existing(
    base: &Path,
    paths: &[PathBuf],
    property: &str,
) -> Result<Vec<PathBuf>, ConfigError> {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let full = base.join(p);
            if full.exists() {
                Ok(full)
            } else {
                Err(ConfigError::invalid(
                    format!("{property}.{i}"),
                    format!("path does not exist: {}", full.display()),
                ))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Coercion, StaticDecl};
    use serde_json::json;
    use tempfile::TempDir;

    fn parse(src: &str) -> Result<Config, ConfigError> {
        let dir = TempDir::new().unwrap();
        parse_at(src, &dir.path().join(DEFAULT_CONFIG_FILE))
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.matchers, vec!["stamp".to_string()]);
        assert!(config.context.is_empty());
        assert!(config.engine.keep_trailing_newline);
        assert!(!config.engine.allow_undefined);
    }

    #[test]
    fn static_shorthand_and_full_form() {
        let config = parse(
            r#"
            [context.static]
            A = "x"
            B = { value = "3", coerce = "int" }
            "#,
        )
        .unwrap();
        assert_eq!(config.context.statics["A"], StaticDecl::new("x"));
        assert_eq!(
            config.context.statics["B"],
            StaticDecl::new(json!("3")).with_coerce(Coercion::Int)
        );
    }

    #[test]
    fn duplicate_key_across_kinds_is_rejected() {
        let err = parse(
            r#"
            context.static.A = "x"
            context.cli.A = { commands = ["echo a"] }
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("[context.cli.A]"), "{err}");
    }

    #[test]
    fn invalid_matcher_is_rejected() {
        let err = parse(r#"matchers = ["Tpl"]"#).unwrap_err();
        assert!(err.to_string().starts_with("[matchers.0]"), "{err}");

        let err = parse("matchers = []").unwrap_err();
        assert!(err.to_string().starts_with("[matchers]"), "{err}");
    }

    #[test]
    fn missing_ignore_file_is_rejected() {
        let err = parse(r#"ignore_files = [".gitignore"]"#).unwrap_err();
        assert!(err.to_string().contains("path does not exist"), "{err}");
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
        let config = parse_at(
            r#"ignore_files = [".gitignore"]"#,
            &dir.path().join(DEFAULT_CONFIG_FILE),
        )
        .unwrap();
        assert_eq!(config.ignore_files, vec![dir.path().join(".gitignore")]);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_at(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = parse("matchers = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn explicit_absolute_path_is_used_as_is() {
        let root = Path::new("/some/root");
        assert_eq!(
            resolve_config_path(root, Some(Path::new("/abs/cfg.toml"))),
            PathBuf::from("/abs/cfg.toml")
        );
    }

    #[test]
    fn default_path_prefers_the_working_directory() {
        let cwd = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();
        std::fs::write(cwd.path().join(DEFAULT_CONFIG_FILE), "").unwrap();

        assert_eq!(
            resolve_config_path_from(Some(cwd.path()), root.path(), None),
            cwd.path().join(DEFAULT_CONFIG_FILE)
        );
    }

    #[test]
    fn default_path_falls_back_to_root() {
        let cwd = TempDir::new().unwrap();
        let root = TempDir::new().unwrap();

        assert_eq!(
            resolve_config_path_from(Some(cwd.path()), root.path(), None),
            root.path().join(DEFAULT_CONFIG_FILE)
        );
        assert_eq!(
            resolve_config_path_from(None, root.path(), Some(Path::new("cfg.toml"))),
            root.path().join("cfg.toml")
        );
    }
}
