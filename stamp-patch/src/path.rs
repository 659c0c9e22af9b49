//! Dotted path addresses and the read/put/delete walks over a value tree.
//!
//! A segment is an object key, or an array index when the node it is
//! applied to is an array.

use serde_json::{Map, Value};

use crate::error::PatchError;

const FORBIDDEN: &[char] = &['/', '\\', '[', ']'];

/// Split and validate a dotted path.
pub fn parse_path(raw: &str) -> Result<Vec<&str>, PatchError> {
    if raw.is_empty() {
        return Err(PatchError::FilePath {
            path: String::new(),
            message: "path cannot be empty".to_string(),
        });
    }
    let segments: Vec<&str> = raw.split('.').collect();
    for (i, seg) in segments.iter().enumerate() {
        let problem = if seg.is_empty() {
            Some("empty segment".to_string())
        } else if let Some(c) = seg.chars().find(|c| FORBIDDEN.contains(c)) {
            Some(format!("segment '{seg}' contains '{c}'"))
        } else {
            None
        };
        if let Some(message) = problem {
            return Err(PatchError::path(&segments[..=i], message));
        }
    }
    Ok(segments)
}

fn index(path: &[&str], at: usize) -> Result<usize, PatchError> {
    path[at].parse::<usize>().map_err(|_| {
        PatchError::path(&path[..=at], format!("'{}' is not an array index", path[at]))
    })
}

fn missing(path: &[&str], at: usize) -> PatchError {
    PatchError::path(&path[..=at], format!("'{}' does not exist", path[at]))
}

fn not_a_container(path: &[&str], at: usize, node: &Value) -> PatchError {
    PatchError::path(
        &path[..=at],
        format!("cannot index into {} with '{}'", kind(node), path[at]),
    )
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// The value at `path`.
pub fn get<'v>(root: &'v Value, path: &[&str]) -> Result<&'v Value, PatchError> {
    let mut node = root;
    for at in 0..path.len() {
        node = match node {
            Value::Object(map) => map.get(path[at]).ok_or_else(|| missing(path, at))?,
            Value::Array(items) => items
                .get(index(path, at)?)
                .ok_or_else(|| missing(path, at))?,
            other => return Err(not_a_container(path, at, other)),
        };
    }
    Ok(node)
}

/// Set `path` to `value`, creating missing intermediate objects.
///
/// An array index equal to the length appends. Returns whether the tree
/// changed.
pub fn put(root: &mut Value, path: &[&str], value: Value) -> Result<bool, PatchError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(PatchError::path(path, "path cannot be empty"));
    };
    let last_at = parents.len();
    let mut node = root;
    for at in 0..parents.len() {
        node = match node {
            Value::Object(map) => map
                .entry(path[at].to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                let i = index(path, at)?;
                if i == items.len() {
                    items.push(Value::Object(Map::new()));
                }
                let len = items.len();
                items.get_mut(i).ok_or_else(|| out_of_bounds(path, at, len))?
            }
            other => return Err(not_a_container(path, at, other)),
        };
    }

    match node {
        Value::Object(map) => {
            if map.get(*last) == Some(&value) {
                return Ok(false);
            }
            map.insert(last.to_string(), value);
            Ok(true)
        }
        Value::Array(items) => {
            let i = index(path, last_at)?;
            if i == items.len() {
                items.push(value);
                return Ok(true);
            }
            let len = items.len();
            let slot = items
                .get_mut(i)
                .ok_or_else(|| out_of_bounds(path, last_at, len))?;
            if *slot == value {
                return Ok(false);
            }
            *slot = value;
            Ok(true)
        }
        other => Err(not_a_container(path, last_at, other)),
    }
}

fn out_of_bounds(path: &[&str], at: usize, len: usize) -> PatchError {
    PatchError::path(
        &path[..=at],
        format!("index {} is out of bounds for an array of length {len}", path[at]),
    )
}

/// Remove `path`. A missing final key or index is a no-op; a missing
/// intermediate is an error. Returns whether the tree changed.
pub fn delete(root: &mut Value, path: &[&str]) -> Result<bool, PatchError> {
    let Some((last, parents)) = path.split_last() else {
        return Err(PatchError::path(path, "path cannot be empty"));
    };
    let last_at = parents.len();
    let mut node = root;
    for at in 0..parents.len() {
        node = match node {
            Value::Object(map) => map.get_mut(path[at]).ok_or_else(|| missing(path, at))?,
            Value::Array(items) => {
                let i = index(path, at)?;
                items.get_mut(i).ok_or_else(|| missing(path, at))?
            }
            other => return Err(not_a_container(path, at, other)),
        };
    }

    match node {
        Value::Object(map) => Ok(map.shift_remove(*last).is_some()),
        Value::Array(items) => {
            let i = index(path, last_at)?;
            if i < items.len() {
                items.remove(i);
                Ok(true)
            } else {
                Ok(false)
            }
        }
        other => Err(not_a_container(path, last_at, other)),
    }
}
