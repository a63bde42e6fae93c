use std::path::Path;

use serde_json::Value;

use super::FormatBackend;
use crate::config::mapping::json_kind;
use crate::config::{ConfigFormat, ConfigMapping};
use crate::error::{ConfigError, Result};

/// A single JSON object whose members are section objects.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBackend;

impl FormatBackend for JsonBackend {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }

    fn parse(&self, path: &Path, content: &str) -> Result<ConfigMapping> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ConfigError::parse(path, ConfigFormat::Json, e.to_string()))?;

        let map = match value {
            Value::Object(map) => map,
            other => {
                return Err(ConfigError::parse(
                    path,
                    ConfigFormat::Json,
                    format!("top level must be an object, got {}", json_kind(&other)),
                )
                .into())
            }
        };

        ConfigMapping::from_map(map)
            .map_err(|reason| ConfigError::parse(path, ConfigFormat::Json, reason).into())
    }

    fn render(&self, mapping: &ConfigMapping) -> Result<String> {
        let mut content = serde_json::to_string_pretty(mapping)
            .map_err(|e| ConfigError::serialize(ConfigFormat::Json, e.to_string()))?;
        content.push('\n');
        Ok(content)
    }
}
