//! Tera rendering engine, see [`Renderer`].
//!
//! One `Renderer` is built per run from the finalized context. Templates are
//! registered under their root-relative source path so that `{% include %}`
//! and `{% extends %}` can refer to each other by that name. With an include
//! root set, any other file under that root can be included too.

use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tera::{Context, Tera};

use stamp_core::coerce::coerce_opt;
use stamp_core::{Config, EngineConfig, Mode, ResolvedContext};

use crate::error::{io_err, RenderError};
use crate::functions::FunctionRegistry;
use crate::syntax::translate;

/// Name of the built-in function exposing env variable defaults.
pub const ENV_DEFAULT_FN: &str = "env_default";

#[allow(clippy::expect_used)]
static RAW_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*raw\s*-?%\}.*?\{%-?\s*endraw\s*-?%\}").expect("static regex")
});

#[allow(clippy::expect_used)]
static REFERENCE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{%-?\s*(?:include|extends|import)\b(.*?)-?%\}").expect("static regex")
});

#[allow(clippy::expect_used)]
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("static regex"));

/// Template engine configured for one run.
pub struct Renderer {
    tera: Tera,
    context: Context,
    engine: EngineConfig,
    include_root: Option<PathBuf>,
}

impl Renderer {
    /// Build a renderer from its parts.
    ///
    /// `env_defaults` maps env context keys to their coerced default values
    /// and backs the `env_default(name=...)` function.
    pub fn new(
        engine: &EngineConfig,
        context: &ResolvedContext,
        functions: &FunctionRegistry,
        env_defaults: BTreeMap<String, Value>,
        mode: Mode,
    ) -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.register_function(
            ENV_DEFAULT_FN,
            move |args: &HashMap<String, Value>| -> tera::Result<Value> {
                let name = args
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| tera::Error::msg("env_default requires a `name` argument"))?;
                env_defaults.get(name).cloned().ok_or_else(|| {
                    let known: Vec<&str> = env_defaults.keys().map(String::as_str).collect();
                    tera::Error::msg(format!(
                        "no env default for '{name}'; env variables with defaults: {}",
                        known.join(", ")
                    ))
                })
            },
        );
        // Registered last so a custom function can shadow a built-in.
        functions.register(&mut tera, mode);

        let context = Context::from_serialize(context).map_err(|source| RenderError::Tera {
            template: "<context>".to_string(),
            source,
        })?;
        Ok(Self {
            tera,
            context,
            engine: engine.clone(),
            include_root: None,
        })
    }

    /// Let templates include or extend any file under `root` by its
    /// root-relative path.
    pub fn with_include_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.include_root = Some(root.into());
        self
    }

    /// Build a renderer from a loaded config, loading its custom extensions.
    pub fn from_config(
        config: &Config,
        context: &ResolvedContext,
        mode: Mode,
    ) -> Result<Self, RenderError> {
        let functions = FunctionRegistry::load(&config.engine.custom_extensions, context)?;
        Self::new(
            &config.engine,
            context,
            &functions,
            env_defaults(config),
            mode,
        )
    }

    /// Register templates by name. Sources are translated to native syntax
    /// first; all templates are added in one batch so they can reference
    /// each other. Files they reference under the include root are loaded
    /// into the same batch.
    pub fn add_templates<'a, I>(&mut self, templates: I) -> Result<(), RenderError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut translated = Vec::new();
        for (name, source) in templates {
            let native = translate(name, source, &self.engine)?;
            translated.push((name.to_string(), native.into_owned()));
        }
        self.load_partials(&mut translated)?;

        let first = translated
            .first()
            .map(|(n, _)| n.clone())
            .unwrap_or_default();
        self.tera
            .add_raw_templates(translated)
            .map_err(|source| RenderError::Tera {
                template: first,
                source,
            })
    }

    fn load_partials(&self, batch: &mut Vec<(String, String)>) -> Result<(), RenderError> {
        let Some(root) = &self.include_root else {
            return Ok(());
        };
        let mut pending: Vec<String> = batch
            .iter()
            .flat_map(|(_, s)| referenced_names(s))
            .collect();
        while let Some(name) = pending.pop() {
            let known = batch.iter().any(|(n, _)| *n == name)
                || self.tera.get_template_names().any(|n| n == name);
            if known {
                continue;
            }
            // Missing files are left for Tera to report at render time.
            let Some(path) = partial_path(root, &name) else {
                continue;
            };
            let source = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let native = translate(&name, &source, &self.engine)?.into_owned();
            pending.extend(referenced_names(&native));
            tracing::debug!("loaded partial {name}");
            batch.push((name, native));
        }
        Ok(())
    }

    /// Render a previously added template.
    pub fn render(&self, name: &str) -> Result<String, RenderError> {
        let mut out = self
            .tera
            .render(name, &self.context)
            .map_err(|source| RenderError::Tera {
                template: name.to_string(),
                source,
            })?;
        if !self.engine.keep_trailing_newline {
            strip_trailing_newline(&mut out);
        }
        Ok(out)
    }

    /// Add and render a single template in one step.
    pub fn render_source(&mut self, name: &str, source: &str) -> Result<String, RenderError> {
        self.add_templates([(name, source)])?;
        self.render(name)
    }
}

/// Template names referenced by `include`, `extends` and `import` tags of a
/// native-syntax source. Raw blocks are skipped.
fn referenced_names(source: &str) -> Vec<String> {
    let cooked = RAW_BLOCK.replace_all(source, "");
    REFERENCE_TAG
        .captures_iter(&cooked)
        .flat_map(|tag| {
            let body = tag.get(1).map_or("", |m| m.as_str());
            QUOTED
                .captures_iter(body)
                .filter_map(|q| q.get(1).or_else(|| q.get(2)))
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// File under `root` for a root-relative template name, if one exists.
fn partial_path(root: &Path, name: &str) -> Option<PathBuf> {
    let rel = Path::new(name);
    if !rel.components().all(|c| matches!(c, Component::Normal(_))) {
        return None;
    }
    let path = root.join(rel);
    path.is_file().then_some(path)
}

/// Coerced default values of every env declaration that has one.
pub fn env_defaults(config: &Config) -> BTreeMap<String, Value> {
    config
        .context
        .env
        .iter()
        .filter_map(|(name, decl)| {
            let default = decl.default.as_ref()?;
            let coerce = default.coerce.or(decl.coerce);
            match coerce_opt(&default.value, coerce) {
                Ok(v) => Some((name.clone(), v)),
                Err(e) => {
                    tracing::warn!("env default for '{name}' does not coerce: {e}");
                    None
                }
            }
        })
        .collect()
}

fn strip_trailing_newline(s: &mut String) {
    if s.ends_with('\n') {
        s.pop();
        if s.ends_with('\r') {
            s.pop();
        }
    }
}
