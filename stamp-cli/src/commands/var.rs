//! `stamp var`: print one resolved context variable.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stamp_sync::{var, VarOptions};

use super::{print_value, OutputMode};

/// Arguments for `stamp var`.
#[derive(Args, Debug)]
pub struct VarArgs {
    /// Context variable name.
    pub key: String,

    #[arg(short, long, value_enum, default_value_t = OutputMode::Raw)]
    pub output: OutputMode,
}

impl VarArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let root = std::env::current_dir().context("could not determine working directory")?;
        let value = var(&VarOptions {
            root,
            config_path: config,
            key: self.key.clone(),
        })
        .with_context(|| format!("could not read context variable '{}'", self.key))?;
        print_value(&value, self.output)
    }
}
