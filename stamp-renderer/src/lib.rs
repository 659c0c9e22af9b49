//! # stamp-renderer
//!
//! Tera-based template rendering for stamp.
//!
//! - [`Renderer`] wraps a configured `tera::Tera` plus the run's context.
//! - [`FunctionRegistry`] loads user functions from Rhai scripts.
//! - [`syntax::translate`] maps custom delimiters onto Tera's native ones.

pub mod engine;
pub mod error;
pub mod functions;
pub mod syntax;

pub use engine::{env_defaults, Renderer, ENV_DEFAULT_FN};
pub use error::RenderError;
pub use functions::{CustomFunction, FunctionRegistry};
