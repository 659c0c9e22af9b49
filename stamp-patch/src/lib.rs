//! # stamp-patch
//!
//! Read, put and delete values inside JSON, YAML and TOML documents using
//! dotted path addresses such as `tool.poetry.version` or `items.0.name`.
//!
//! Documents are edited as a `serde_json::Value` tree. Key order survives a
//! round trip; comments and formatting do not.

pub mod document;
pub mod error;
pub mod format;
pub mod path;

use serde_json::Value;

use stamp_core::coerce::coerce_opt;
use stamp_core::Coercion;

pub use document::{Document, Outcome, Target};
pub use error::PatchError;
pub use format::Format;

/// Read the value at `path` from a file or inline document.
pub fn read(target: &str, path: &str, format: Option<Format>) -> Result<Value, PatchError> {
    let doc = Document::load(Target::detect(target)?, format)?;
    doc.read(path).cloned()
}

/// Set `path` to `raw`, coerced as requested (a trimmed string by default).
pub fn put(
    target: &str,
    path: &str,
    raw: &str,
    coerce: Option<Coercion>,
    format: Option<Format>,
) -> Result<Outcome, PatchError> {
    let value = coerce_opt(&Value::String(raw.to_string()), coerce)?;
    let mut doc = Document::load(Target::detect(target)?, format)?;
    doc.put(path, value)?;
    doc.save()
}

/// Remove `path`; removing something that is already absent is a no-op.
pub fn delete(target: &str, path: &str, format: Option<Format>) -> Result<Outcome, PatchError> {
    let mut doc = Document::load(Target::detect(target)?, format)?;
    doc.delete(path)?;
    doc.save()
}
