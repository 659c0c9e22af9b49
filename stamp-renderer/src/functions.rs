//! Custom template functions backed by embedded Rhai scripts.
//!
//! A unit is either a single `.rhai` file or a package directory whose entry
//! point is `main.rhai`. Every public function a unit defines becomes a
//! template function called with named arguments matching its parameter
//! names: `fn greet(name)` is used as `{{ greet(name="x") }}`. Scripts can
//! read the resolved context through the `context()` function.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhai::module_resolvers::FileModuleResolver;
use rhai::{Dynamic, Engine, FnAccess, Scope, AST};
use serde_json::Value;

use stamp_core::{Mode, ResolvedContext};

use crate::error::{io_err, RenderError};

/// Entry unit of a package directory.
pub const PACKAGE_ENTRY: &str = "main.rhai";

const SCRIPT_EXTENSION: &str = "rhai";

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct ScriptUnit {
    path: PathBuf,
    engine: Engine,
    ast: AST,
}

/// One callable exposed to templates.
#[derive(Clone)]
pub struct CustomFunction {
    pub name: String,
    /// Unit the function was loaded from.
    pub path: PathBuf,
    /// Parameter lists of every overload, by arity.
    pub overloads: Vec<Vec<String>>,
    unit: Arc<ScriptUnit>,
}

impl std::fmt::Debug for CustomFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFunction")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("overloads", &self.overloads)
            .finish()
    }
}

/// Every custom function loaded for a run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, CustomFunction>,
}

impl FunctionRegistry {
    /// Load every unit in `paths` and check names against `context`.
    pub fn load(paths: &[PathBuf], context: &ResolvedContext) -> Result<Self, RenderError> {
        let mut registry = FunctionRegistry::default();
        for path in paths {
            let unit = Arc::new(load_unit(path, context)?);
            let mut overloads: BTreeMap<String, Vec<Vec<String>>> = BTreeMap::new();
            for f in unit.ast.iter_functions() {
                if f.access != FnAccess::Public || f.name.starts_with("anon$") {
                    continue;
                }
                overloads
                    .entry(f.name.to_string())
                    .or_default()
                    .push(f.params.iter().map(|p| p.to_string()).collect());
            }

            for (name, overloads) in overloads {
                if context.contains(&name) {
                    return Err(RenderError::FunctionClash {
                        name,
                        path: unit.path.clone(),
                    });
                }
                if let Some(existing) = registry.functions.get(&name) {
                    return Err(RenderError::DuplicateFunction {
                        name,
                        first: existing.path.clone(),
                        second: unit.path.clone(),
                    });
                }
                tracing::debug!("custom function '{}' from {}", name, unit.path.display());
                registry.functions.insert(
                    name.clone(),
                    CustomFunction {
                        name,
                        path: unit.path.clone(),
                        overloads,
                        unit: Arc::clone(&unit),
                    },
                );
            }
        }
        Ok(registry)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Register every function with `tera`. In superlight mode the
    /// registered callables return the empty string without running.
    pub fn register(&self, tera: &mut tera::Tera, mode: Mode) {
        for f in self.functions.values() {
            let f = f.clone();
            let name = f.name.clone();
            if mode == Mode::Superlight {
                tera.register_function(
                    &name,
                    |_: &HashMap<String, Value>| -> tera::Result<Value> {
                        Ok(Value::String(String::new()))
                    },
                );
            } else {
                tera.register_function(&name, move |args: &HashMap<String, Value>| f.call(args));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

impl CustomFunction {
    /// Call with named arguments, picking the overload whose parameter
    /// names match the argument names exactly.
    pub fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let params = self
            .overloads
            .iter()
            .find(|p| p.len() == args.len() && p.iter().all(|n| args.contains_key(n)))
            .ok_or_else(|| {
                let expected: Vec<String> =
                    self.overloads.iter().map(|p| format!("({})", p.join(", "))).collect();
                let mut given: Vec<&str> = args.keys().map(String::as_str).collect();
                given.sort_unstable();
                tera::Error::msg(format!(
                    "function '{}' called with arguments ({}); expected one of: {}",
                    self.name,
                    given.join(", "),
                    expected.join(" ")
                ))
            })?;

        let mut call_args: Vec<Dynamic> = Vec::with_capacity(params.len());
        for p in params {
            let arg = rhai::serde::to_dynamic(&args[p]).map_err(|e| self.error(e))?;
            call_args.push(arg);
        }

        let result: Dynamic = self
            .unit
            .engine
            .call_fn(&mut Scope::new(), &self.unit.ast, &self.name, call_args)
            .map_err(|e| self.error(e))?;
        if result.is_unit() {
            return Ok(Value::Null);
        }
        rhai::serde::from_dynamic::<Value>(&result).map_err(|e| self.error(e))
    }

    fn error(&self, e: impl std::fmt::Display) -> tera::Error {
        tera::Error::msg(format!(
            "custom function '{}' ({}) failed: {e}",
            self.name,
            self.path.display()
        ))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

fn load_error(path: &Path, message: impl Into<String>) -> RenderError {
    RenderError::ExtensionLoad {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

/// Locate the entry script for a unit path.
fn entry_point(path: &Path) -> Result<PathBuf, RenderError> {
    if path.is_dir() {
        let entry = path.join(PACKAGE_ENTRY);
        if !entry.is_file() {
            return Err(load_error(
                path,
                format!("package directory has no {PACKAGE_ENTRY} entry"),
            ));
        }
        return Ok(entry);
    }
    if !path.is_file() {
        return Err(load_error(path, "path does not exist"));
    }
    if path.extension().and_then(|e| e.to_str()) != Some(SCRIPT_EXTENSION) {
        return Err(load_error(
            path,
            format!("not a .{SCRIPT_EXTENSION} script or package directory"),
        ));
    }
    Ok(path.to_path_buf())
}

fn load_unit(path: &Path, context: &ResolvedContext) -> Result<ScriptUnit, RenderError> {
    let entry = entry_point(path)?;
    let base = entry.parent().unwrap_or_else(|| Path::new("."));

    let mut engine = Engine::new();
    engine.set_module_resolver(FileModuleResolver::new_with_path(base));
    let ctx = rhai::serde::to_dynamic(&context.0).map_err(|e| load_error(path, e.to_string()))?;
    engine.register_fn("context", move || ctx.clone());

    let source = std::fs::read_to_string(&entry).map_err(|e| io_err(&entry, e))?;
    let ast = engine
        .compile_into_self_contained(&Scope::new(), &source)
        .map_err(|e| load_error(&entry, e.to_string()))?;

    Ok(ScriptUnit {
        path: path.to_path_buf(),
        engine,
        ast,
    })
}
