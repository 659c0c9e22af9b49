//! # stamp-sync
//!
//! Render orchestration, the lockfile cache and atomic output writes.
//!
//! Call [`render`] to run the whole pipeline for a render root, or [`var`]
//! to look up a single context value.

pub mod error;
pub mod lockfile;
pub mod pipeline;
pub mod writer;

pub use error::SyncError;
pub use lockfile::{hash_output, LockCache, Lockfile, LOCKFILE_VERSION};
pub use pipeline::{render, var, RenderOptions, RenderReport, RenderResult, VarOptions};
