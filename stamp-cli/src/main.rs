//! stamp: render templates and keep config files in sync.
//!
//! # Usage
//!
//! ```text
//! stamp render [ROOT] [--force] [--light|--superlight] [--ban-defaults[=K,...]] [--json]
//! stamp var KEY [-o raw|json]
//! stamp read TARGET PATH [-o raw|json] [--format json|yaml|toml]
//! stamp put TARGET PATH VALUE [--coerce str|int|float|bool|json] [--format ...]
//! stamp del TARGET PATH [--format ...]
//! stamp replace-matcher OLD NEW [--root DIR] [--yes]
//! ```
//!
//! Global flags: `-c/--config PATH`, `-v` (repeat for more detail).

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use commands::{
    file::{DelArgs, PutArgs, ReadArgs},
    render::RenderArgs,
    replace_matcher::ReplaceMatcherArgs,
    var::VarArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stamp",
    version,
    about = "Render templates from a resolved context and sync structured config files",
    long_about = None,
)]
struct Cli {
    /// Config file; relative paths are tried from the working directory,
    /// then the render root.
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log detail (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render every template under the root.
    Render(RenderArgs),

    /// Print one resolved context variable.
    Var(VarArgs),

    /// Read a value from a JSON, YAML or TOML document.
    Read(ReadArgs),

    /// Set a value inside a JSON, YAML or TOML document.
    Put(PutArgs),

    /// Delete a value from a JSON, YAML or TOML document.
    Del(DelArgs),

    /// Rename templates from one matcher to another.
    ReplaceMatcher(ReplaceMatcherArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = cli.config;
    match cli.command {
        Commands::Render(args) => args.run(config),
        Commands::Var(args) => args.run(config),
        Commands::Read(args) => args.run(),
        Commands::Put(args) => args.run(),
        Commands::Del(args) => args.run(),
        Commands::ReplaceMatcher(args) => args.run(config),
    }
}

/// Logs go to stderr so stdout stays pipeable. `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
