//! stamp core library: config types, config loading, coercion, errors.
//!
//! - [`types`]: config and context domain types
//! - [`config`]: locate, parse, and validate `stamp.config.toml`
//! - [`coerce`]: typed coercion of raw literals
//! - [`error`]: [`ConfigError`], [`CoercionError`]

pub mod coerce;
pub mod config;
pub mod error;
pub mod types;
mod validate;

pub use error::{CoercionError, ConfigError};
pub use types::{
    is_valid_matcher, CliDecl, Coercion, Config, ContextConfig, ContextDecl, EngineConfig,
    EnvDecl, Mode, ResolvedContext, StaticDecl, Task, TaskPhase, Tasks, DEFAULT_CONFIG_FILE,
    DEFAULT_MATCHER, LOCKFILE_NAME,
};
