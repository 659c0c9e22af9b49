//! Error types for stamp-runtime.

use std::path::PathBuf;

use thiserror::Error;

use stamp_core::CoercionError;

use crate::process::CommandError;

/// Why a single context variable could not be resolved.
#[derive(Debug, Error)]
pub enum VarError {
    #[error("could not find environment variable '{env_name}' and no default is set")]
    MissingEnvVar { env_name: String },

    #[error("environment variable '{env_name}' is not set and its default is banned")]
    BannedDefault { env_name: String },

    #[error(transparent)]
    Coercion(#[from] CoercionError),

    #[error(transparent)]
    Command(#[from] CommandError),

    /// The final command succeeded but printed nothing.
    #[error("command `{command}` produced no output (implicit none)")]
    ImplicitNone { command: String },

    #[error("resolver task aborted: {0}")]
    Aborted(String),
}

/// Errors from context resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// One or more variables failed; sorted by variable name.
    #[error("failed to resolve context:\n{}", format_failures(.0))]
    Variables(Vec<(String, VarError)>),

    #[error(
        "unrecognized --ban-defaults name(s): {}; env variables: {}",
        .names.join(", "),
        .known.join(", ")
    )]
    UnrecognizedBanName {
        names: Vec<String>,
        known: Vec<String>,
    },

    #[error("unknown context variable '{name}'; known: {}", .known.join(", "))]
    UnknownVariable { name: String, known: Vec<String> },
}

fn format_failures(failures: &[(String, VarError)]) -> String {
    failures
        .iter()
        .map(|(name, e)| format!("  {name}: {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors from the task runner.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A nested invocation that would recurse into the render pipeline.
    #[error("`stamp {operation}` cannot run inside a pre task or while rendering from a task")]
    TaskRecursion { operation: &'static str },

    #[error("{phase} task {index} failed: {source}")]
    Command {
        phase: stamp_core::TaskPhase,
        index: usize,
        #[source]
        source: CommandError,
    },

    #[error("parent state error at {path}: {source}")]
    ParentStateIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed parent state at {path}: {source}")]
    ParentStateJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown context variable '{name}'; known: {}", .known.join(", "))]
    UnknownVariable { name: String, known: Vec<String> },
}
