//! Error types for stamp-core.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::types::Coercion;

/// Errors raised while locating, parsing, or validating the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file at the resolved location.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure, with the path being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The TOML is well formed but does not describe a valid config.
    ///
    /// `property` is the dotted path of the offending value, e.g.
    /// `context.static.NAME.coerce`.
    #[error("[{property}]: {message}")]
    Invalid { property: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(property: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            property: property.into(),
            message: message.into(),
        }
    }
}

/// A raw literal could not be converted to the requested type.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("could not coerce {value} to {target}: {reason}")]
pub struct CoercionError {
    pub value: String,
    pub target: Coercion,
    pub reason: String,
}

impl CoercionError {
    pub(crate) fn new(value: &Value, target: Coercion, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            target,
            reason: reason.into(),
        }
    }
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
