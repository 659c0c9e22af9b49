//! Context resolution.
//!
//! Static values are coerced first. Every cli variable then gets its own
//! task in a `JoinSet`, so independent command chains run concurrently with
//! each other and with env lookups. The resolver always waits for every
//! task before reporting, and reports every failure, sorted by name.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde_json::Value;
use tokio::task::JoinSet;

use stamp_core::coerce::coerce_opt;
use stamp_core::{CliDecl, Config, EnvDecl, Mode, ResolvedContext, StaticDecl};

use crate::error::{ResolveError, VarError};
use crate::process::run_command;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which env defaults `--ban-defaults` forbids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BanDefaults {
    /// Every env default.
    All,
    /// Only the defaults of these context keys.
    Keys(BTreeSet<String>),
}

impl BanDefaults {
    /// Build from the raw flag values; an empty list bans everything.
    pub fn from_names(names: Vec<String>) -> Self {
        if names.is_empty() {
            BanDefaults::All
        } else {
            BanDefaults::Keys(names.into_iter().collect())
        }
    }

    fn bans(&self, name: &str) -> bool {
        match self {
            BanDefaults::All => true,
            BanDefaults::Keys(keys) => keys.contains(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub mode: Mode,
    pub ban_defaults: Option<BanDefaults>,
    /// Working directory for cli commands.
    pub cwd: PathBuf,
}

impl ResolveOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            mode: Mode::Normal,
            ban_defaults: None,
            cwd: cwd.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve every declared variable.
pub async fn resolve(
    config: &Config,
    opts: &ResolveOptions,
) -> Result<ResolvedContext, ResolveError> {
    resolve_selected(config, opts, None).await
}

/// Resolve a single variable, without running any other cli chain.
pub async fn resolve_one(
    config: &Config,
    opts: &ResolveOptions,
    name: &str,
) -> Result<Value, ResolveError> {
    if config.context.lookup(name).is_none() {
        return Err(ResolveError::UnknownVariable {
            name: name.to_string(),
            known: config.context.names().iter().map(|s| s.to_string()).collect(),
        });
    }
    let mut ctx = resolve_selected(config, opts, Some(name)).await?;
    ctx.0
        .remove(name)
        .ok_or_else(|| ResolveError::UnknownVariable {
            name: name.to_string(),
            known: Vec::new(),
        })
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

async fn resolve_selected(
    config: &Config,
    opts: &ResolveOptions,
    only: Option<&str>,
) -> Result<ResolvedContext, ResolveError> {
    check_ban_names(config, opts.ban_defaults.as_ref())?;
    let wanted = |name: &str| only.map_or(true, |o| o == name);

    let mut ctx = ResolvedContext::default();
    let mut failures: Vec<(String, VarError)> = Vec::new();
    let mut record = |name: &str, result: Result<Value, VarError>, ctx: &mut ResolvedContext| {
        match result {
            Ok(v) => ctx.insert(name, v),
            Err(e) => failures.push((name.to_string(), e)),
        }
    };

    for (name, decl) in config.context.statics.iter().filter(|(n, _)| wanted(n.as_str())) {
        record(name.as_str(), resolve_static(decl), &mut ctx);
    }

    let mut pending = JoinSet::new();
    for (name, decl) in config.context.cli.iter().filter(|(n, _)| wanted(n.as_str())) {
        if opts.mode.is_light() {
            record(name.as_str(), resolve_light(decl), &mut ctx);
            continue;
        }
        let name = name.clone();
        let decl = decl.clone();
        let cwd = opts.cwd.clone();
        pending.spawn(async move {
            let result = resolve_cli(&decl, &cwd).await;
            (name, result)
        });
    }

    for (name, decl) in config.context.env.iter().filter(|(n, _)| wanted(n.as_str())) {
        let result = resolve_env(name, decl, opts.ban_defaults.as_ref());
        record(name.as_str(), result, &mut ctx);
    }

    while let Some(joined) = pending.join_next().await {
        match joined {
            Ok((name, result)) => record(name.as_str(), result, &mut ctx),
            Err(e) => record("<task>", Err(VarError::Aborted(e.to_string())), &mut ctx),
        }
    }

    if failures.is_empty() {
        tracing::debug!("resolved {} context variables", ctx.len());
        Ok(ctx)
    } else {
        failures.sort_by(|a, b| a.0.cmp(&b.0));
        Err(ResolveError::Variables(failures))
    }
}

fn check_ban_names(config: &Config, bans: Option<&BanDefaults>) -> Result<(), ResolveError> {
    let Some(BanDefaults::Keys(keys)) = bans else {
        return Ok(());
    };
    let unknown: Vec<String> = keys
        .iter()
        .filter(|k| !config.context.env.contains_key(*k))
        .cloned()
        .collect();
    if unknown.is_empty() {
        return Ok(());
    }
    Err(ResolveError::UnrecognizedBanName {
        names: unknown,
        known: config.context.env.keys().cloned().collect(),
    })
}

fn resolve_static(decl: &StaticDecl) -> Result<Value, VarError> {
    Ok(coerce_opt(&decl.value, decl.coerce)?)
}

fn resolve_env(name: &str, decl: &EnvDecl, bans: Option<&BanDefaults>) -> Result<Value, VarError> {
    let env_name = decl.env_name.as_deref().unwrap_or(name);
    if let Some(raw) = std::env::var_os(env_name) {
        let raw = Value::String(raw.to_string_lossy().into_owned());
        return Ok(coerce_opt(&raw, decl.coerce)?);
    }
    match &decl.default {
        Some(_) if bans.is_some_and(|b| b.bans(name)) => Err(VarError::BannedDefault {
            env_name: env_name.to_string(),
        }),
        Some(default) => Ok(coerce_opt(&default.value, default.coerce.or(decl.coerce))?),
        None => Err(VarError::MissingEnvVar {
            env_name: env_name.to_string(),
        }),
    }
}

fn resolve_light(decl: &CliDecl) -> Result<Value, VarError> {
    match &decl.light {
        Some(light) => Ok(coerce_opt(&light.value, light.coerce.or(decl.coerce))?),
        None => Ok(Value::String(String::new())),
    }
}

async fn resolve_cli(decl: &CliDecl, cwd: &std::path::Path) -> Result<Value, VarError> {
    let mut last = (String::new(), String::new());
    for command in &decl.commands {
        let stdout = run_command(command, cwd, &[]).await?;
        last = (command.clone(), stdout);
    }
    let (command, stdout) = last;
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(VarError::ImplicitNone { command });
    }
    Ok(coerce_opt(&Value::String(trimmed.to_string()), decl.coerce)?)
}
