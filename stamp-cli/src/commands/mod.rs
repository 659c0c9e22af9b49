pub mod file;
pub mod render;
pub mod replace_matcher;
pub mod var;

use clap::ValueEnum;
use serde_json::Value;

/// How `var` and `read` print a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Strings unquoted, everything else as compact JSON.
    #[default]
    Raw,
    /// Pretty-printed JSON.
    Json,
}

pub fn print_value(value: &Value, mode: OutputMode) -> anyhow::Result<()> {
    match (mode, value) {
        (OutputMode::Raw, Value::String(s)) => println!("{s}"),
        (OutputMode::Raw, other) => println!("{}", serde_json::to_string(other)?),
        (OutputMode::Json, other) => println!("{}", serde_json::to_string_pretty(other)?),
    }
    Ok(())
}
