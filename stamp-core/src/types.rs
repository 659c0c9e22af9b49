//! Domain types for stamp configuration and resolved context.
//!
//! All path fields use `PathBuf`. Every config type is deserializable from the
//! TOML config file and serializable into the `render --json` debug dump.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Matcher used when the config file does not declare any.
pub const DEFAULT_MATCHER: &str = "stamp";

/// Whether `m` can be used as a matcher: non-empty, only `a-z`, `0-9`, `_`
/// and `-`.
pub fn is_valid_matcher(m: &str) -> bool {
    !m.is_empty()
        && m
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

/// Config file name searched for in the working directory, then the render
/// root.
pub const DEFAULT_CONFIG_FILE: &str = "stamp.config.toml";

/// Lockfile name, always relative to the render root.
pub const LOCKFILE_NAME: &str = ".stamp.lock";

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// How much of the context is actually computed during a run.
///
/// `Light` and `Superlight` exist to break circular dependencies where a
/// cli variable reads a file that the render itself produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Run every cli command and every custom function.
    #[default]
    Normal,
    /// Cli variables use their `light` value; custom functions still run.
    Light,
    /// Like `Light`, and custom functions render as the empty string.
    Superlight,
}

impl Mode {
    /// `true` for both light variants.
    pub fn is_light(self) -> bool {
        !matches!(self, Mode::Normal)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::Normal => "normal",
            Mode::Light => "light",
            Mode::Superlight => "superlight",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Coercion
// ---------------------------------------------------------------------------

/// Target type a raw literal is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    Str,
    Int,
    Float,
    Bool,
    Json,
}

impl Coercion {
    pub const ALL: [Coercion; 5] = [
        Coercion::Str,
        Coercion::Int,
        Coercion::Float,
        Coercion::Bool,
        Coercion::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Coercion::Str => "str",
            Coercion::Int => "int",
            Coercion::Float => "float",
            Coercion::Bool => "bool",
            Coercion::Json => "json",
        }
    }
}

impl fmt::Display for Coercion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Coercion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Coercion::ALL
            .into_iter()
            .find(|c| c.as_str() == s.to_ascii_lowercase())
            .ok_or_else(|| {
                format!("unknown coercion '{s}'; expected one of: str, int, float, bool, json")
            })
    }
}

// ---------------------------------------------------------------------------
// Context declarations
// ---------------------------------------------------------------------------

/// A literal value plus an optional coercion.
///
/// Accepts both `{ value = "x", coerce = "int" }` and the bare shorthand
/// `"x"` when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticDecl {
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coerce: Option<Coercion>,
}

impl StaticDecl {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            coerce: None,
        }
    }

    pub fn with_coerce(mut self, coerce: Coercion) -> Self {
        self.coerce = Some(coerce);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StaticDeclRepr {
    Full {
        value: Value,
        #[serde(default)]
        coerce: Option<Coercion>,
    },
    Bare(Value),
}

impl<'de> Deserialize<'de> for StaticDecl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match StaticDeclRepr::deserialize(deserializer)? {
            StaticDeclRepr::Full { value, coerce } => StaticDecl { value, coerce },
            StaticDeclRepr::Bare(value) => StaticDecl {
                value,
                coerce: None,
            },
        })
    }
}

/// A variable read from the process environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvDecl {
    /// Variable to read; the context key is used when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<StaticDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coerce: Option<Coercion>,
}

/// A variable computed from the stdout of a command chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliDecl {
    pub commands: Vec<String>,
    /// Value substituted in light modes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub light: Option<StaticDecl>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coerce: Option<Coercion>,
}

/// Borrowed view of one declaration, whichever table it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContextDecl<'a> {
    Static(&'a StaticDecl),
    Env(&'a EnvDecl),
    Cli(&'a CliDecl),
}

/// The `[context]` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    #[serde(default, rename = "static")]
    pub statics: BTreeMap<String, StaticDecl>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvDecl>,
    #[serde(default)]
    pub cli: BTreeMap<String, CliDecl>,
}

impl ContextConfig {
    /// Look up a declaration by context key.
    pub fn lookup(&self, name: &str) -> Option<ContextDecl<'_>> {
        if let Some(d) = self.statics.get(name) {
            return Some(ContextDecl::Static(d));
        }
        if let Some(d) = self.env.get(name) {
            return Some(ContextDecl::Env(d));
        }
        self.cli.get(name).map(ContextDecl::Cli)
    }

    /// Every declared key, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .statics
            .keys()
            .chain(self.env.keys())
            .chain(self.cli.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.statics.is_empty() && self.env.is_empty() && self.cli.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

fn default_block_start() -> String {
    "{%".to_string()
}
fn default_block_end() -> String {
    "%}".to_string()
}
fn default_variable_start() -> String {
    "{{".to_string()
}
fn default_variable_end() -> String {
    "}}".to_string()
}
fn default_comment_start() -> String {
    "{#".to_string()
}
fn default_comment_end() -> String {
    "#}".to_string()
}
fn default_true() -> bool {
    true
}

/// The `[engine]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_block_start")]
    pub block_start: String,
    #[serde(default = "default_block_end")]
    pub block_end: String,
    #[serde(default = "default_variable_start")]
    pub variable_start: String,
    #[serde(default = "default_variable_end")]
    pub variable_end: String,
    #[serde(default = "default_comment_start")]
    pub comment_start: String,
    #[serde(default = "default_comment_end")]
    pub comment_end: String,
    #[serde(default = "default_true")]
    pub keep_trailing_newline: bool,
    #[serde(default)]
    pub allow_undefined: bool,
    /// Script files or package directories, absolute after loading.
    #[serde(default)]
    pub custom_extensions: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_start: default_block_start(),
            block_end: default_block_end(),
            variable_start: default_variable_start(),
            variable_end: default_variable_end(),
            comment_start: default_comment_start(),
            comment_end: default_comment_end(),
            keep_trailing_newline: true,
            allow_undefined: false,
            custom_extensions: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// `true` when every delimiter is the engine's native one.
    pub fn has_default_syntax(&self) -> bool {
        let d = EngineConfig::default();
        self.block_start == d.block_start
            && self.block_end == d.block_end
            && self.variable_start == d.variable_start
            && self.variable_end == d.variable_end
            && self.comment_start == d.comment_start
            && self.comment_end == d.comment_end
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// An ordered list of shell commands run as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub commands: Vec<String>,
}

/// Which side of the render a task list runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    Pre,
    Post,
}

impl fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPhase::Pre => f.write_str("pre"),
            TaskPhase::Post => f.write_str("post"),
        }
    }
}

/// The `[tasks]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tasks {
    #[serde(default)]
    pub pre: Vec<Task>,
    #[serde(default)]
    pub post: Vec<Task>,
}

impl Tasks {
    pub fn phase(&self, phase: TaskPhase) -> &[Task] {
        match phase {
            TaskPhase::Pre => &self.pre,
            TaskPhase::Post => &self.post,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn default_matchers() -> Vec<String> {
    vec![DEFAULT_MATCHER.to_string()]
}

/// A fully loaded and validated `stamp.config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Absolute path of the file this config was loaded from.
    #[serde(skip_deserializing, default)]
    pub path: PathBuf,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    /// Gitignore-style files, absolute after loading.
    #[serde(default)]
    pub ignore_files: Vec<PathBuf>,
    #[serde(default = "default_matchers")]
    pub matchers: Vec<String>,
    #[serde(default)]
    pub tasks: Tasks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            context: ContextConfig::default(),
            exclude: Vec::new(),
            engine: EngineConfig::default(),
            ignore_files: Vec::new(),
            matchers: default_matchers(),
            tasks: Tasks::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Resolved context
// ---------------------------------------------------------------------------

/// The finalized name → value map handed to templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedContext(pub BTreeMap<String, Value>);

impl ResolvedContext {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for ResolvedContext {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}
