//! Documents loaded from a file or from inline text.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{io_err, PatchError};
use crate::format::Format;
use crate::path;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Inline(String),
}

impl Target {
    /// Decide whether `raw` names a file or is the document text itself.
    ///
    /// Anything that exists on disk is a file. Otherwise single-line text
    /// that looks like a path (absolute, starting with `.` or `~`, or
    /// carrying a known extension) is treated as a missing file.
    pub fn detect(raw: &str) -> Result<Self, PatchError> {
        let path = PathBuf::from(raw);
        if path.is_file() {
            return Ok(Target::File(path));
        }
        if looks_like_path(raw, &path) {
            return Err(PatchError::FileNotFound { path });
        }
        Ok(Target::Inline(raw.to_string()))
    }
}

fn looks_like_path(raw: &str, path: &Path) -> bool {
    if raw.contains('\n') || raw.trim().is_empty() {
        return false;
    }
    path.is_absolute()
        || raw.starts_with('.')
        || raw.starts_with('~')
        || Format::from_extension(path).is_some()
}

/// What happened to the document after a modification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Written(PathBuf),
    Unchanged(PathBuf),
    /// Inline targets are never persisted; this is the new text.
    Inline(String),
}

/// A parsed document and the format it round-trips through.
#[derive(Debug)]
pub struct Document {
    target: Target,
    format: Format,
    root: Value,
    modified: bool,
}

impl Document {
    /// Load and parse `target`.
    ///
    /// A file's format comes from its extension, then from `hint`. Inline
    /// text uses `hint`, else the first format in [`Format::INFER_ORDER`]
    /// that parses it.
    pub fn load(target: Target, hint: Option<Format>) -> Result<Self, PatchError> {
        let (text, format) = match &target {
            Target::File(p) => {
                let text = std::fs::read_to_string(p).map_err(|e| io_err(p, e))?;
                let format = Format::from_extension(p).or(hint).ok_or_else(|| {
                    PatchError::UnknownFormat {
                        message: format!(
                            "{} has no json/yaml/toml extension; pass a format",
                            p.display()
                        ),
                    }
                })?;
                (text, Some(format))
            }
            Target::Inline(text) => (text.clone(), hint),
        };

        let (format, root) = match format {
            Some(f) => (f, f.parse(&text)?),
            None => infer(&text)?,
        };
        tracing::debug!("loaded {format} document from {target:?}");
        Ok(Self {
            target,
            format,
            root,
            modified: false,
        })
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn read(&self, raw_path: &str) -> Result<&Value, PatchError> {
        let segments = path::parse_path(raw_path)?;
        path::get(&self.root, &segments)
    }

    pub fn put(&mut self, raw_path: &str, value: Value) -> Result<(), PatchError> {
        let segments = path::parse_path(raw_path)?;
        if self.format == Format::Toml && value.is_null() {
            return Err(PatchError::InvalidPutValue {
                message: "toml has no null value".to_string(),
            });
        }
        self.modified |= path::put(&mut self.root, &segments, value)?;
        Ok(())
    }

    pub fn delete(&mut self, raw_path: &str) -> Result<(), PatchError> {
        let segments = path::parse_path(raw_path)?;
        self.modified |= path::delete(&mut self.root, &segments)?;
        Ok(())
    }

    /// Serialize the current tree in the document's format.
    pub fn to_text(&self) -> Result<String, PatchError> {
        self.format.serialize(&self.root)
    }

    /// Persist modifications. Files are rewritten only when the tree changed.
    pub fn save(&self) -> Result<Outcome, PatchError> {
        match &self.target {
            Target::Inline(_) => Ok(Outcome::Inline(self.to_text()?)),
            Target::File(p) if !self.modified => Ok(Outcome::Unchanged(p.clone())),
            Target::File(p) => {
                let text = self.to_text()?;
                std::fs::write(p, text).map_err(|e| io_err(p, e))?;
                tracing::info!("updated {}", p.display());
                Ok(Outcome::Written(p.clone()))
            }
        }
    }
}

fn infer(text: &str) -> Result<(Format, Value), PatchError> {
    let mut failures = Vec::new();
    for format in Format::INFER_ORDER {
        match format.parse(text) {
            Ok(v) => return Ok((format, v)),
            Err(e) => failures.push(e.to_string()),
        }
    }
    Err(PatchError::UnknownFormat {
        message: format!("no format parses the input:\n  {}", failures.join("\n  ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn inline_text_is_detected() {
        assert_eq!(
            Target::detect("{\"a\": 1}").unwrap(),
            Target::Inline("{\"a\": 1}".into())
        );
        assert_eq!(
            Target::detect("a = 1\nb = 2").unwrap(),
            Target::Inline("a = 1\nb = 2".into())
        );
    }

    #[test]
    fn missing_path_like_target_is_not_found() {
        for raw in ["./nope.json", "missing.toml", "/definitely/not/here"] {
            assert!(
                matches!(Target::detect(raw), Err(PatchError::FileNotFound { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn existing_file_is_detected() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("data");
        std::fs::write(&p, "{}").unwrap();
        assert_eq!(
            Target::detect(p.to_str().unwrap()).unwrap(),
            Target::File(p)
        );
    }

    #[test]
    fn inline_format_is_inferred_in_order() {
        let json_doc = Document::load(Target::Inline("{\"a\": 1}".into()), None).unwrap();
        assert_eq!(json_doc.format(), Format::Json);

        let toml_doc = Document::load(Target::Inline("a = 1".into()), None).unwrap();
        assert_eq!(toml_doc.format(), Format::Toml);

        let yaml_doc = Document::load(Target::Inline("a: 1\nb: [x]".into()), None).unwrap();
        assert_eq!(yaml_doc.format(), Format::Yaml);
        assert_eq!(yaml_doc.root(), &json!({"a": 1, "b": ["x"]}));
    }

    #[test]
    fn file_without_known_extension_uses_hint() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("settings.conf");
        std::fs::write(&p, "a = 1\n").unwrap();

        let err = Document::load(Target::File(p.clone()), None).unwrap_err();
        assert!(matches!(err, PatchError::UnknownFormat { .. }));

        let doc = Document::load(Target::File(p), Some(Format::Toml)).unwrap();
        assert_eq!(doc.read("a").unwrap(), &json!(1));
    }

    #[test]
    fn toml_null_put_is_rejected() {
        let mut doc = Document::load(Target::Inline("a = 1".into()), Some(Format::Toml)).unwrap();
        assert!(matches!(
            doc.put("b", Value::Null),
            Err(PatchError::InvalidPutValue { .. })
        ));
    }
}
