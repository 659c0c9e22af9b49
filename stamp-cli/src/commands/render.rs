//! `stamp render`: render every template under a root.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stamp_core::Mode;
use stamp_runtime::BanDefaults;
use stamp_sync::{render, RenderOptions, RenderResult};

/// Arguments for `stamp render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Render root.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Ignore the lockfile and rewrite every output.
    #[arg(short, long)]
    pub force: bool,

    /// Use `light` values for cli variables instead of running their commands.
    #[arg(long, conflicts_with = "superlight")]
    pub light: bool,

    /// Like `--light`, and custom functions render as empty strings.
    #[arg(long)]
    pub superlight: bool,

    /// Forbid env defaults: all of them, or only the listed keys
    /// (`--ban-defaults=A,B`).
    #[arg(
        long,
        value_name = "KEYS",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = ""
    )]
    pub ban_defaults: Option<String>,

    /// Print the full run report as JSON.
    #[arg(long)]
    pub json: bool,
}

impl RenderArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let mode = if self.superlight {
            Mode::Superlight
        } else if self.light {
            Mode::Light
        } else {
            Mode::Normal
        };
        let ban_defaults = self.ban_defaults.as_deref().map(|raw| {
            BanDefaults::from_names(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        });

        let opts = RenderOptions {
            root: self.root.clone(),
            config_path: config,
            force: self.force,
            mode,
            ban_defaults,
        };
        let report = render(&opts)
            .with_context(|| format!("render failed for {}", self.root.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_results(&report.result);
        }
        Ok(())
    }
}

fn print_results(result: &RenderResult) {
    let lockfile = if result.lockfile_modified {
        "lockfile modified"
    } else {
        "lockfile unchanged"
    };
    println!(
        "{} {} written, {} identical, {lockfile}",
        "✓".green(),
        result.written.len(),
        result.identical.len()
    );
    for path in &result.written {
        println!("  {}  {path}", "✎".yellow());
    }
    for path in &result.identical {
        println!("  {}  {path}", "·".dimmed());
    }
}
