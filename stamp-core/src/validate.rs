//! Structural validation of the raw TOML document.
//!
//! Runs before serde deserialization so every failure carries the dotted
//! property path of the offending value instead of a line/column pair.

use toml::{Table, Value};

use crate::error::ConfigError;
use crate::types::Coercion;

type Result<T> = std::result::Result<T, ConfigError>;

const ROOT_KEYS: &[&str] = &[
    "context",
    "exclude",
    "engine",
    "ignore_files",
    "matchers",
    "tasks",
];
const CONTEXT_KEYS: &[&str] = &["static", "env", "cli"];
const ENGINE_KEYS: &[&str] = &[
    "block_start",
    "block_end",
    "variable_start",
    "variable_end",
    "comment_start",
    "comment_end",
    "keep_trailing_newline",
    "allow_undefined",
    "custom_extensions",
];
const STATIC_KEYS: &[&str] = &["value", "coerce"];
const ENV_KEYS: &[&str] = &["env_name", "default", "coerce"];
const CLI_KEYS: &[&str] = &["commands", "light", "coerce"];
const TASKS_KEYS: &[&str] = &["pre", "post"];
const TASK_KEYS: &[&str] = &["commands"];

/// Validate the shape of a parsed config document.
pub(crate) fn validate_document(doc: &Table) -> Result<()> {
    check_keys(doc, ROOT_KEYS, "")?;

    if let Some(v) = doc.get("context") {
        validate_context(v, "context")?;
    }
    if let Some(v) = doc.get("exclude") {
        string_array(v, "exclude", false)?;
    }
    if let Some(v) = doc.get("engine") {
        validate_engine(v, "engine")?;
    }
    if let Some(v) = doc.get("ignore_files") {
        string_array(v, "ignore_files", true)?;
    }
    if let Some(v) = doc.get("matchers") {
        string_array(v, "matchers", true)?;
    }
    if let Some(v) = doc.get("tasks") {
        validate_tasks(v, "tasks")?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

fn validate_context(v: &Value, path: &str) -> Result<()> {
    let t = table(v, path)?;
    check_keys(t, CONTEXT_KEYS, path)?;

    if let Some(v) = t.get("static") {
        let path = join(path, "static");
        for (name, decl) in table(v, &path)? {
            validate_static(decl, &join(&path, name))?;
        }
    }
    if let Some(v) = t.get("env") {
        let path = join(path, "env");
        for (name, decl) in table(v, &path)? {
            validate_env(decl, &join(&path, name))?;
        }
    }
    if let Some(v) = t.get("cli") {
        let path = join(path, "cli");
        for (name, decl) in table(v, &path)? {
            validate_cli(decl, &join(&path, name))?;
        }
    }
    Ok(())
}

/// A static value is either `{ value, coerce? }` or any bare literal.
fn validate_static(v: &Value, path: &str) -> Result<()> {
    match v {
        Value::Table(t) if t.contains_key("value") => {
            check_keys(t, STATIC_KEYS, path)?;
            let value_path = join(path, "value");
            non_empty_literal(&t["value"], &value_path)?;
            if let Some(c) = t.get("coerce") {
                coercion(c, &join(path, "coerce"))?;
            }
            Ok(())
        }
        other => non_empty_literal(other, path),
    }
}

fn validate_env(v: &Value, path: &str) -> Result<()> {
    let t = table(v, path)?;
    check_keys(t, ENV_KEYS, path)?;
    if let Some(name) = t.get("env_name") {
        non_empty_string(name, &join(path, "env_name"))?;
    }
    if let Some(default) = t.get("default") {
        validate_static(default, &join(path, "default"))?;
    }
    if let Some(c) = t.get("coerce") {
        coercion(c, &join(path, "coerce"))?;
    }
    Ok(())
}

fn validate_cli(v: &Value, path: &str) -> Result<()> {
    let t = table(v, path)?;
    check_keys(t, CLI_KEYS, path)?;
    let commands = t
        .get("commands")
        .ok_or_else(|| ConfigError::invalid(path, "missing required property 'commands'"))?;
    string_array(commands, &join(path, "commands"), true)?;
    // Light values may be empty strings, so only the full form is checked.
    if let Some(Value::Table(lt)) = t.get("light") {
        if lt.contains_key("value") {
            let light_path = join(path, "light");
            check_keys(lt, STATIC_KEYS, &light_path)?;
            if let Some(c) = lt.get("coerce") {
                coercion(c, &join(&light_path, "coerce"))?;
            }
        }
    }
    if let Some(c) = t.get("coerce") {
        coercion(c, &join(path, "coerce"))?;
    }
    Ok(())
}

fn validate_engine(v: &Value, path: &str) -> Result<()> {
    let t = table(v, path)?;
    check_keys(t, ENGINE_KEYS, path)?;
    for key in &ENGINE_KEYS[..6] {
        if let Some(d) = t.get(*key) {
            non_empty_string(d, &join(path, key))?;
        }
    }
    for key in ["keep_trailing_newline", "allow_undefined"] {
        if let Some(b) = t.get(key) {
            if !b.is_bool() {
                return Err(wrong_type(&join(path, key), "boolean", b));
            }
        }
    }
    if let Some(exts) = t.get("custom_extensions") {
        string_array(exts, &join(path, "custom_extensions"), true)?;
    }
    Ok(())
}

fn validate_tasks(v: &Value, path: &str) -> Result<()> {
    let t = table(v, path)?;
    check_keys(t, TASKS_KEYS, path)?;
    for phase in TASKS_KEYS {
        let Some(list) = t.get(*phase) else { continue };
        let phase_path = join(path, phase);
        let Value::Array(items) = list else {
            return Err(wrong_type(&phase_path, "array", list));
        };
        for (i, task) in items.iter().enumerate() {
            let task_path = join(&phase_path, &i.to_string());
            let tt = table(task, &task_path)?;
            check_keys(tt, TASK_KEYS, &task_path)?;
            let commands = tt.get("commands").ok_or_else(|| {
                ConfigError::invalid(&task_path, "missing required property 'commands'")
            })?;
            string_array(commands, &join(&task_path, "commands"), true)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Primitives
// ---------------------------------------------------------------------------

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::String(_) => "string",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Boolean(_) => "boolean",
        Value::Datetime(_) => "datetime",
        Value::Array(_) => "array",
        Value::Table(_) => "table",
    }
}

fn wrong_type(path: &str, expected: &str, got: &Value) -> ConfigError {
    ConfigError::invalid(
        path,
        format!("expected {expected}, found {}", type_name(got)),
    )
}

fn table<'a>(v: &'a Value, path: &str) -> Result<&'a Table> {
    v.as_table().ok_or_else(|| wrong_type(path, "table", v))
}

fn check_keys(t: &Table, allowed: &[&str], path: &str) -> Result<()> {
    for key in t.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ConfigError::invalid(
                join(path, key),
                format!("unknown property; expected one of: {}", allowed.join(", ")),
            ));
        }
    }
    Ok(())
}

fn non_empty_string(v: &Value, path: &str) -> Result<()> {
    match v {
        Value::String(s) if s.is_empty() => Err(ConfigError::invalid(path, "must not be empty")),
        Value::String(_) => Ok(()),
        other => Err(wrong_type(path, "string", other)),
    }
}

fn non_empty_literal(v: &Value, path: &str) -> Result<()> {
    match v {
        Value::String(s) if s.is_empty() => Err(ConfigError::invalid(path, "must not be empty")),
        _ => Ok(()),
    }
}

fn string_array(v: &Value, path: &str, non_empty_items: bool) -> Result<()> {
    let Value::Array(items) = v else {
        return Err(wrong_type(path, "array", v));
    };
    for (i, item) in items.iter().enumerate() {
        let item_path = join(path, &i.to_string());
        if non_empty_items {
            non_empty_string(item, &item_path)?;
        } else if !item.is_str() {
            return Err(wrong_type(&item_path, "string", item));
        }
    }
    Ok(())
}

fn coercion(v: &Value, path: &str) -> Result<()> {
    let Value::String(s) = v else {
        return Err(wrong_type(path, "string", v));
    };
    if Coercion::ALL.iter().any(|c| c.as_str() == s) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            path,
            format!("invalid value '{s}'; expected one of: str, int, float, bool, json"),
        ))
    }
}
