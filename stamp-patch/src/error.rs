//! Error types for stamp-patch.

use std::path::{Path, PathBuf};

use thiserror::Error;

use stamp_core::CoercionError;

use crate::format::Format;

#[derive(Debug, Error)]
pub enum PatchError {
    /// The path address is malformed or does not lead anywhere.
    #[error("invalid path '{path}': {message}")]
    FilePath { path: String, message: String },

    #[error("file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// The document format cannot represent the assignment.
    #[error("cannot put value: {message}")]
    InvalidPutValue { message: String },

    #[error("invalid {format} document: {message}")]
    Parse { format: Format, message: String },

    #[error("could not determine the document format: {message}")]
    UnknownFormat { message: String },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub(crate) fn path(path: &[&str], message: impl Into<String>) -> Self {
        PatchError::FilePath {
            path: path.join("."),
            message: message.into(),
        }
    }
}

pub(crate) fn io_err(path: &Path, source: std::io::Error) -> PatchError {
    PatchError::Io {
        path: path.to_path_buf(),
        source,
    }
}
