//! The render pipeline and the `var` lookup.
//!
//! `render` order: pre tasks, resolve context, discover templates, render
//! every template in memory, write changed outputs, persist the lockfile,
//! post tasks. Nothing is written until every template has rendered, so a
//! failing template leaves the tree and the lockfile untouched.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use stamp_core::config::{load_at, resolve_config_path};
use stamp_core::{Config, Mode, ResolvedContext, TaskPhase};
use stamp_discovery::{discover, TemplateFile};
use stamp_renderer::Renderer;
use stamp_runtime::{
    ensure_not_in_task, in_task, load_parent_state, resolve, resolve_one, run_tasks,
    BanDefaults, ParentState, ResolveOptions, TaskError,
};

use crate::error::{io_err, SyncError};
use crate::lockfile::{hash_output, LockCache};
use crate::writer::write_atomic;

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub root: PathBuf,
    /// Explicit config path; defaults to `stamp.config.toml` in `root`.
    pub config_path: Option<PathBuf>,
    /// Ignore the lockfile and rewrite every output.
    pub force: bool,
    pub mode: Mode,
    pub ban_defaults: Option<BanDefaults>,
}

impl RenderOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config_path: None,
            force: false,
            mode: Mode::Normal,
            ban_defaults: None,
        }
    }
}

/// Root-relative paths touched by a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderResult {
    pub written: Vec<String>,
    pub identical: Vec<String>,
    pub matched_templates: Vec<String>,
    pub lockfile_modified: bool,
}

/// Everything a run produced; serialized as the `--json` debug dump.
#[derive(Debug, Clone, Serialize)]
pub struct RenderReport {
    pub config: Config,
    pub context: ResolvedContext,
    pub result: RenderResult,
}

#[derive(Debug, Clone)]
pub struct VarOptions {
    /// Directory the config is searched from when not running in a task.
    pub root: PathBuf,
    pub config_path: Option<PathBuf>,
    pub key: String,
}

// ---------------------------------------------------------------------------
// render
// ---------------------------------------------------------------------------

/// Run the full render pipeline.
pub fn render(opts: &RenderOptions) -> Result<RenderReport, SyncError> {
    ensure_not_in_task("render")?;

    let root = opts
        .root
        .canonicalize()
        .map_err(|_| stamp_discovery::DiscoveryError::RootNotFound {
            path: opts.root.clone(),
        })?;
    stamp_discovery::check_root(&root)?;
    let config = load_at(&resolve_config_path(&root, opts.config_path.as_deref()))?;
    tracing::debug!("using config {}", config.path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(render_with(&root, config, opts))
}

async fn render_with(
    root: &Path,
    config: Config,
    opts: &RenderOptions,
) -> Result<RenderReport, SyncError> {
    let run_tasks_here = !opts.mode.is_light();
    if run_tasks_here {
        run_tasks(TaskPhase::Pre, config.tasks.phase(TaskPhase::Pre), root, None).await?;
    } else if !config.tasks.pre.is_empty() || !config.tasks.post.is_empty() {
        tracing::info!("{} mode: skipping tasks", opts.mode);
    }

    let resolve_opts = ResolveOptions {
        mode: opts.mode,
        ban_defaults: opts.ban_defaults.clone(),
        cwd: root.to_path_buf(),
    };
    let context = resolve(&config, &resolve_opts).await?;

    let templates = discover(root, &config)?;
    tracing::info!("found {} template(s)", templates.len());
    let rendered = render_all(root, &config, &context, opts.mode, &templates)?;

    let mut cache = LockCache::load(root, opts.force)?;
    let mut result = RenderResult {
        matched_templates: templates.iter().map(|t| rel_string(&t.rel_source)).collect(),
        ..RenderResult::default()
    };
    for (template, output) in templates.iter().zip(rendered) {
        let rel_output = rel_string(&template.rel_output);
        let hash = hash_output(&output);
        if !opts.force && cache.is_current(&rel_output, &hash, &template.output_path) {
            tracing::debug!("identical: {rel_output}");
            result.identical.push(rel_output.clone());
        } else {
            write_atomic(&template.output_path, &output)?;
            tracing::info!("wrote {rel_output}");
            result.written.push(rel_output.clone());
        }
        cache.record(&rel_output, hash);
    }
    result.lockfile_modified = cache.finish()?;

    if run_tasks_here {
        let parent = ParentState {
            config_path: config.path.clone(),
            root: root.to_path_buf(),
            context: context.clone(),
        };
        run_tasks(
            TaskPhase::Post,
            config.tasks.phase(TaskPhase::Post),
            root,
            Some(&parent),
        )
        .await?;
    }

    Ok(RenderReport {
        config,
        context,
        result,
    })
}

fn render_all(
    root: &Path,
    config: &Config,
    context: &ResolvedContext,
    mode: Mode,
    templates: &[TemplateFile],
) -> Result<Vec<String>, SyncError> {
    let mut sources = Vec::with_capacity(templates.len());
    for t in templates {
        let text = std::fs::read_to_string(&t.source_path).map_err(|e| io_err(&t.source_path, e))?;
        sources.push((rel_string(&t.rel_source), text));
    }

    let mut renderer = Renderer::from_config(config, context, mode)?.with_include_root(root);
    renderer.add_templates(sources.iter().map(|(n, s)| (n.as_str(), s.as_str())))?;
    sources
        .iter()
        .map(|(name, _)| renderer.render(name).map_err(SyncError::from))
        .collect()
}

/// Root-relative path with `/` separators, as used for template names and
/// lockfile keys.
fn rel_string(p: &Path) -> String {
    p.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ---------------------------------------------------------------------------
// var
// ---------------------------------------------------------------------------

/// Look up one finalized context value.
///
/// From a post task this reads the parent run's snapshot. From a pre task
/// it fails, since the context does not exist yet. Outside any task it runs
/// the pre tasks and resolves only the requested variable.
pub fn var(opts: &VarOptions) -> Result<Value, SyncError> {
    if in_task() {
        let Some(state) = load_parent_state()? else {
            return Err(TaskError::TaskRecursion { operation: "var" }.into());
        };
        return Ok(state.var(&opts.key)?.clone());
    }

    let config = load_at(&resolve_config_path(&opts.root, opts.config_path.as_deref()))?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(async {
        let cwd = config.dir().to_path_buf();
        run_tasks(TaskPhase::Pre, config.tasks.phase(TaskPhase::Pre), &cwd, None).await?;
        let value = resolve_one(&config, &ResolveOptions::new(cwd), &opts.key).await?;
        Ok::<_, SyncError>(value)
    })
}
