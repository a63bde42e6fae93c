use std::path::Path;

use serde_json::{Map, Number, Value};

use super::FormatBackend;
use crate::config::{ConfigFormat, ConfigMapping};
use crate::error::{ConfigError, Result};

/// Top-level TOML tables are sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlBackend;

impl FormatBackend for TomlBackend {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }

    fn parse(&self, path: &Path, content: &str) -> Result<ConfigMapping> {
        let table: ::toml::Table = content.parse().map_err(|e: ::toml::de::Error| {
            ConfigError::parse(path, ConfigFormat::Toml, e.message())
        })?;

        let map: Map<String, Value> = table
            .into_iter()
            .map(|(k, v)| (k, from_toml(v)))
            .collect();

        ConfigMapping::from_map(map)
            .map_err(|reason| ConfigError::parse(path, ConfigFormat::Toml, reason).into())
    }

    fn render(&self, mapping: &ConfigMapping) -> Result<String> {
        let mut table = ::toml::Table::new();
        for (name, section) in mapping.sections() {
            let mut converted = ::toml::Table::new();
            for (key, value) in section {
                let value = to_toml(value).map_err(|reason| {
                    ConfigError::serialize(
                        ConfigFormat::Toml,
                        format!("{}.{}: {}", name, key, reason),
                    )
                })?;
                converted.insert(key.clone(), value);
            }
            table.insert(name.to_string(), ::toml::Value::Table(converted));
        }

        ::toml::to_string(&table)
            .map_err(|e| ConfigError::serialize(ConfigFormat::Toml, e.to_string()).into())
    }
}

fn from_toml(value: ::toml::Value) -> Value {
    match value {
        ::toml::Value::String(s) => Value::String(s),
        ::toml::Value::Integer(i) => Value::from(i),
        ::toml::Value::Float(f) => Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(f.to_string())),
        ::toml::Value::Boolean(b) => Value::Bool(b),
        ::toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        ::toml::Value::Array(items) => Value::Array(items.into_iter().map(from_toml).collect()),
        ::toml::Value::Table(table) => {
            Value::Object(table.into_iter().map(|(k, v)| (k, from_toml(v))).collect())
        }
    }
}

fn to_toml(value: &Value) -> std::result::Result<::toml::Value, String> {
    Ok(match value {
        Value::Null => return Err("TOML has no null value".to_string()),
        Value::Bool(b) => ::toml::Value::Boolean(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ::toml::Value::Integer(i)
            } else if n.is_u64() {
                return Err(format!("integer {} does not fit in 64-bit signed TOML integer", n));
            } else {
                ::toml::Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => ::toml::Value::String(s.clone()),
        Value::Array(items) => ::toml::Value::Array(
            items.iter().map(to_toml).collect::<std::result::Result<_, _>>()?,
        ),
        Value::Object(map) => {
            let mut table = ::toml::Table::new();
            for (k, v) in map {
                table.insert(k.clone(), to_toml(v)?);
            }
            ::toml::Value::Table(table)
        }
    })
}
