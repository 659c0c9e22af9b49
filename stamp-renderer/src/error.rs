//! Error types for stamp-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building the renderer or rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera failed to parse or render a template.
    #[error("failed to render {template}: {source}")]
    Tera {
        template: String,
        #[source]
        source: tera::Error,
    },

    /// A custom-extension unit could not be loaded.
    #[error("failed to load extension {path}: {message}")]
    ExtensionLoad { path: PathBuf, message: String },

    /// A custom function shares its name with a context key.
    #[error("custom function '{name}' from {path} clashes with the context key of the same name")]
    FunctionClash { name: String, path: PathBuf },

    /// Two extension units define the same function.
    #[error("custom function '{name}' is defined in both {first} and {second}")]
    DuplicateFunction {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A tag opened with a custom delimiter is never closed.
    #[error("unterminated tag in {template} at line {line}: expected '{expected}'")]
    UnterminatedTag {
        template: String,
        line: usize,
        expected: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RenderError {
    RenderError::Io {
        path: path.into(),
        source,
    }
}
