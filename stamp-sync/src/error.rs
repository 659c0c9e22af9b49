//! Error types for stamp-sync.

use std::path::PathBuf;

use thiserror::Error;

use stamp_core::ConfigError;
use stamp_discovery::DiscoveryError;
use stamp_renderer::RenderError;
use stamp_runtime::{ResolveError, TaskError};

/// All errors that can arise from a render run or a `var` lookup.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lockfile serialization error.
    #[error("lockfile JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
