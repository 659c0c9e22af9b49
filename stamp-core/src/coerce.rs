//! Typed coercion of raw literals.
//!
//! Strings are trimmed before any conversion, so command output with a
//! trailing newline coerces the same as the bare literal.

use serde_json::{Number, Value};

use crate::error::CoercionError;
use crate::types::Coercion;

/// Coerce `raw` to `target`, or return it trimmed when no coercion applies.
pub fn coerce_opt(raw: &Value, target: Option<Coercion>) -> Result<Value, CoercionError> {
    match target {
        Some(target) => coerce(raw, target),
        None => Ok(trimmed(raw)),
    }
}

/// Coerce `raw` to the `target` type.
pub fn coerce(raw: &Value, target: Coercion) -> Result<Value, CoercionError> {
    let raw = trimmed(raw);
    match target {
        Coercion::Str => Ok(match raw {
            Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }),
        Coercion::Int => to_int(&raw),
        Coercion::Float => to_float(&raw),
        Coercion::Bool => to_bool(&raw),
        Coercion::Json => match raw {
            Value::String(s) => serde_json::from_str(&s)
                .map_err(|e| CoercionError::new(&Value::String(s.clone()), target, e.to_string())),
            structured => Ok(structured),
        },
    }
}

fn trimmed(raw: &Value) -> Value {
    match raw {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    }
}

fn to_int(raw: &Value) -> Result<Value, CoercionError> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(f) if f.is_finite() => {
            // Integers outside f64's exact range keep their original value.
            if let Value::Number(num) = raw {
                if let Some(i) = num.as_i64() {
                    return Ok(Value::from(i));
                }
            }
            if let Value::String(s) = raw {
                if let Ok(i) = s.parse::<i64>() {
                    return Ok(Value::from(i));
                }
            }
            Ok(Value::from(f.round() as i64))
        }
        _ => Err(CoercionError::new(raw, Coercion::Int, "not a number")),
    }
}

fn to_float(raw: &Value) -> Result<Value, CoercionError> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    n.and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| CoercionError::new(raw, Coercion::Float, "not a finite number"))
}

fn to_bool(raw: &Value) -> Result<Value, CoercionError> {
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(Value::Bool(false)),
        Value::Number(n) if n.as_f64() == Some(1.0) => Ok(Value::Bool(true)),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Ok(Value::Bool(true)),
            "false" | "no" | "n" => Ok(Value::Bool(false)),
            _ => Err(CoercionError::new(
                raw,
                Coercion::Bool,
                "expected one of: true, false, yes, no, y, n",
            )),
        },
        _ => Err(CoercionError::new(raw, Coercion::Bool, "not a boolean")),
    }
}
