//! `stamp replace-matcher`: move templates from one matcher to another.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use stamp_core::config::{load_at, resolve_config_path};
use stamp_discovery::{apply_renames, matcher_renames, MatcherRename};

/// Arguments for `stamp replace-matcher`.
#[derive(Args, Debug)]
pub struct ReplaceMatcherArgs {
    /// Matcher the templates use now.
    pub old: String,

    /// Matcher to rename them to.
    pub new: String,

    /// Root to search for templates.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Rename without asking for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

impl ReplaceMatcherArgs {
    pub fn run(self, config: Option<PathBuf>) -> Result<()> {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("root directory not found: {}", self.root.display()))?;
        let config = load_at(&resolve_config_path(&root, config.as_deref()))?;
        let renames = matcher_renames(&root, &config, &self.old, &self.new)
            .with_context(|| format!("could not replace matcher '{}'", self.old))?;

        if renames.is_empty() {
            println!("{} no templates use matcher '{}'", "·".dimmed(), self.old);
            return Ok(());
        }

        println!(
            "{} template(s) use matcher '{}' and will be renamed:",
            renames.len(),
            self.old
        );
        for r in &renames {
            print_rename(&root, r);
        }

        if !self.yes && !confirm("Rename these files?")? {
            println!("aborted, nothing renamed");
            return Ok(());
        }
        apply_renames(&renames)?;
        println!("{} renamed {} file(s)", "✓".green(), renames.len());
        Ok(())
    }
}

fn print_rename(root: &Path, r: &MatcherRename) {
    let from = r.from.strip_prefix(root).unwrap_or(&r.from);
    let to = r.to.strip_prefix(root).unwrap_or(&r.to);
    println!("  {}  {} -> {}", "✎".yellow(), from.display(), to.display());
}

/// Ask a yes/no question on stdin. Anything but `y`/`yes`, including EOF,
/// is a no.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
