//! `stamp read`, `stamp put` and `stamp del`: edit structured documents.
//!
//! These never touch the render pipeline, so they are allowed inside tasks.

use anyhow::{Context, Result};
use clap::Args;

use stamp_core::Coercion;
use stamp_patch::{Format, Outcome};

use super::{print_value, OutputMode};

/// Arguments for `stamp read`.
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// A file path, or the document text itself.
    pub target: String,

    /// Dotted path, e.g. `tool.poetry.version` or `items.0`.
    pub path: String,

    #[arg(short, long, value_enum, default_value_t = OutputMode::Raw)]
    pub output: OutputMode,

    /// Document format when it cannot be inferred (json, yaml, toml).
    #[arg(long)]
    pub format: Option<Format>,
}

impl ReadArgs {
    pub fn run(self) -> Result<()> {
        let value = stamp_patch::read(&self.target, &self.path, self.format)
            .with_context(|| format!("could not read '{}'", self.path))?;
        print_value(&value, self.output)
    }
}

/// Arguments for `stamp put`.
#[derive(Args, Debug)]
pub struct PutArgs {
    /// A file path, or the document text itself.
    pub target: String,

    /// Dotted path; missing objects along the way are created.
    pub path: String,

    /// New value, a string unless `--coerce` says otherwise.
    pub value: String,

    /// Coerce the value first (str, int, float, bool, json).
    #[arg(long)]
    pub coerce: Option<Coercion>,

    /// Document format when it cannot be inferred (json, yaml, toml).
    #[arg(long)]
    pub format: Option<Format>,
}

impl PutArgs {
    pub fn run(self) -> Result<()> {
        let outcome = stamp_patch::put(
            &self.target,
            &self.path,
            &self.value,
            self.coerce,
            self.format,
        )
        .with_context(|| format!("could not put '{}'", self.path))?;
        report(outcome);
        Ok(())
    }
}

/// Arguments for `stamp del`.
#[derive(Args, Debug)]
pub struct DelArgs {
    /// A file path, or the document text itself.
    pub target: String,

    /// Dotted path to remove.
    pub path: String,

    /// Document format when it cannot be inferred (json, yaml, toml).
    #[arg(long)]
    pub format: Option<Format>,
}

impl DelArgs {
    pub fn run(self) -> Result<()> {
        let outcome = stamp_patch::delete(&self.target, &self.path, self.format)
            .with_context(|| format!("could not delete '{}'", self.path))?;
        report(outcome);
        Ok(())
    }
}

fn report(outcome: Outcome) {
    match outcome {
        Outcome::Inline(text) => print!("{text}"),
        Outcome::Written(path) => tracing::info!("updated {}", path.display()),
        Outcome::Unchanged(path) => tracing::info!("unchanged {}", path.display()),
    }
}
