//! Supported document formats and their conversion to and from a JSON tree.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::error::PatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Order in which inline text is tried when no format is given.
    pub const INFER_ORDER: [Format; 3] = [Format::Json, Format::Toml, Format::Yaml];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    /// Parse `text` into a JSON value tree.
    pub fn parse(self, text: &str) -> Result<Value, PatchError> {
        let parse_err = |message: String| PatchError::Parse {
            format: self,
            message,
        };
        match self {
            Format::Json => serde_json::from_str(text).map_err(|e| parse_err(e.to_string())),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| parse_err(e.to_string())),
            Format::Toml => {
                let table: toml::Table =
                    toml::from_str(text).map_err(|e| parse_err(e.to_string()))?;
                Ok(toml_to_json(toml::Value::Table(table)))
            }
        }
    }

    /// Serialize a value tree back to text in this format.
    pub fn serialize(self, value: &Value) -> Result<String, PatchError> {
        match self {
            Format::Json => {
                let mut out = serde_json::to_string_pretty(value).map_err(|e| {
                    PatchError::InvalidPutValue {
                        message: e.to_string(),
                    }
                })?;
                out.push('\n');
                Ok(out)
            }
            Format::Yaml => {
                serde_yaml::to_string(value).map_err(|e| PatchError::InvalidPutValue {
                    message: e.to_string(),
                })
            }
            Format::Toml => {
                let Value::Object(_) = value else {
                    return Err(PatchError::InvalidPutValue {
                        message: "a toml document root must be a table".to_string(),
                    });
                };
                let converted = json_to_toml(value)?;
                toml::to_string_pretty(&converted).map_err(|e| PatchError::InvalidPutValue {
                    message: e.to_string(),
                })
            }
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            "toml" => Ok(Format::Toml),
            other => Err(PatchError::UnknownFormat {
                message: format!("'{other}' is not one of json, yaml, toml"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// TOML <-> JSON
// ---------------------------------------------------------------------------

fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::from(i),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        toml::Value::Boolean(b) => Value::Bool(b),
        // Datetimes have no JSON counterpart; they travel as strings.
        toml::Value::Datetime(d) => Value::String(d.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

fn json_to_toml(value: &Value) -> Result<toml::Value, PatchError> {
    Ok(match value {
        Value::Null => {
            return Err(PatchError::InvalidPutValue {
                message: "toml has no null value".to_string(),
            })
        }
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => toml::Value::Integer(i),
            None => match n.as_f64() {
                Some(f) => toml::Value::Float(f),
                None => {
                    return Err(PatchError::InvalidPutValue {
                        message: format!("{n} does not fit a toml number"),
                    })
                }
            },
        },
        Value::String(s) => toml::Value::String(s.clone()),
        Value::Array(items) => {
            toml::Value::Array(items.iter().map(json_to_toml).collect::<Result<_, _>>()?)
        }
        Value::Object(map) => {
            let mut table = toml::Table::new();
            for (k, v) in map {
                table.insert(k.clone(), json_to_toml(v)?);
            }
            toml::Value::Table(table)
        }
    })
}
