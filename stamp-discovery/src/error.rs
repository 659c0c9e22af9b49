//! Error types for stamp-discovery.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from template discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("root directory not found: {path}")]
    RootNotFound { path: PathBuf },

    #[error("root is not a directory: {path}")]
    RootNotDirectory { path: PathBuf },

    /// An ignore file could not be read or one of its patterns is invalid.
    #[error("invalid ignore pattern in {source_name}: {source}")]
    Ignore {
        source_name: String,
        #[source]
        source: ignore::Error,
    },

    /// Two templates render to the same output file.
    #[error("templates {first} and {second} both render to {output}")]
    DuplicateOutput {
        output: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid matcher '{matcher}'; only a-z, 0-9, '_' and '-' are allowed")]
    InvalidMatcher { matcher: String },

    #[error("cannot rename {from}: {to} already exists")]
    RenameTargetExists { from: PathBuf, to: PathBuf },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DiscoveryError {
    DiscoveryError::Io {
        path: path.into(),
        source,
    }
}
