use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::{ConfigFormat, ConfigMapping, ConfigValue, Section};
use crate::error::{ConfigError, Result, UtilitiesError};

/// One project's configuration, loaded from and written back to its file.
///
/// Every [`ProjectConfig::set`] persists immediately, so the cached mapping
/// and the file on disk never drift apart.
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    name: String,
    path: PathBuf,
    format: ConfigFormat,
    mapping: ConfigMapping,
}

impl ProjectConfig {
    /// Read an existing file.
    pub(crate) fn load(name: &str, path: PathBuf, format: ConfigFormat) -> Result<Self> {
        debug!("Loading {} config '{}' from {}", format, name, path.display());
        let mapping = format.backend().load(&path)?;
        Ok(Self {
            name: name.to_string(),
            path,
            format,
            mapping,
        })
    }

    /// Write `mapping` as a new file.
    pub(crate) fn create(
        name: &str,
        path: PathBuf,
        format: ConfigFormat,
        mapping: ConfigMapping,
    ) -> Result<Self> {
        let config = Self {
            name: name.to_string(),
            path,
            format,
            mapping,
        };
        config.save()?;
        Ok(config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    pub fn mapping(&self) -> &ConfigMapping {
        &self.mapping
    }

    pub fn sections(&self) -> Vec<&str> {
        self.mapping.section_names()
    }

    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.get(section, key).is_ok()
    }

    /// A whole section; the name is matched case-insensitively if needed.
    pub fn section(&self, section: &str) -> Result<&Section> {
        let real = self.resolve_section(section)?;
        self.mapping
            .section(real)
            .ok_or_else(|| self.section_error(section))
    }

    pub fn get(&self, section: &str, key: &str) -> Result<&ConfigValue> {
        let real_section = self.resolve_section(section)?;
        let real_key = self
            .mapping
            .resolve_key(real_section, key)
            .ok_or_else(|| self.key_error(real_section, key))?;

        self.mapping
            .get(real_section, real_key)
            .ok_or_else(|| self.key_error(real_section, key))
    }

    /// The value as text. Fails for non-string values (JSON/TOML numbers etc).
    pub fn get_str(&self, section: &str, key: &str) -> Result<&str> {
        self.get(section, key)?.as_str().ok_or_else(|| {
            UtilitiesError::Validation(format!(
                "{}.{} in '{}' is not a string",
                section, key, self.name
            ))
        })
    }

    /// Deserialize one value. Strings holding a scalar (`"8080"`, `"true"`) are
    /// accepted for numeric or boolean targets, which is what INI files hold.
    pub fn get_as<T: DeserializeOwned>(&self, section: &str, key: &str) -> Result<T> {
        let value = self.get(section, key)?;
        deserialize_lenient(value).map_err(|e| {
            UtilitiesError::Validation(format!("{}.{} in '{}': {}", section, key, self.name, e))
        })
    }

    /// Typed view of a whole section, e.g. a `#[derive(Deserialize)]` struct.
    pub fn section_as<T: DeserializeOwned>(&self, section: &str) -> Result<T> {
        let value = Value::Object(self.section(section)?.clone());
        deserialize_lenient(&value).map_err(|e| {
            UtilitiesError::Validation(format!("section {} in '{}': {}", section, self.name, e))
        })
    }

    /// Update one value and write the file. Missing sections and keys are
    /// appended; existing ones keep their stored spelling.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<ConfigValue>) -> Result<()> {
        let section_existed = self.mapping.resolve_section(section).is_some();
        let real_section = self
            .mapping
            .resolve_section(section)
            .unwrap_or(section)
            .to_string();
        let real_key = self
            .mapping
            .resolve_key(&real_section, key)
            .unwrap_or(key)
            .to_string();

        let previous = self.mapping.set(&real_section, &real_key, value);

        if let Err(e) = self.save() {
            warn!(
                "Failed to persist {}.{} for '{}', reverting: {}",
                real_section, real_key, self.name, e
            );
            match previous {
                Some(old) => {
                    self.mapping.set(&real_section, &real_key, old);
                }
                None if !section_existed => {
                    self.mapping.remove_section(&real_section);
                }
                None => {
                    if let Some(s) = self.mapping.section_mut(&real_section) {
                        s.shift_remove(&real_key);
                    }
                }
            }
            return Err(e);
        }

        debug!("Set {}.{} in '{}'", real_section, real_key, self.name);
        Ok(())
    }

    /// Drop in-memory state and re-read the file.
    pub fn reload(&mut self) -> Result<()> {
        self.mapping = self.format.backend().load(&self.path)?;
        Ok(())
    }

    /// Write the current mapping to disk.
    pub fn save(&self) -> Result<()> {
        debug!("Saving {} config '{}' to {}", self.format, self.name, self.path.display());
        self.format.backend().save(&self.path, &self.mapping)
    }

    fn resolve_section(&self, section: &str) -> Result<&str> {
        self.mapping
            .resolve_section(section)
            .ok_or_else(|| self.section_error(section))
    }

    fn section_error(&self, section: &str) -> UtilitiesError {
        ConfigError::Section {
            name: self.name.clone(),
            section: section.to_string(),
        }
        .into()
    }

    fn key_error(&self, section: &str, key: &str) -> UtilitiesError {
        ConfigError::Key {
            name: self.name.clone(),
            section: section.to_string(),
            key: key.to_string(),
        }
        .into()
    }
}

fn deserialize_lenient<T: DeserializeOwned>(value: &Value) -> serde_json::Result<T> {
    match serde_json::from_value(value.clone()) {
        Ok(v) => Ok(v),
        Err(first) => {
            let coerced = coerce_scalars(value);
            if coerced == *value {
                return Err(first);
            }
            serde_json::from_value(coerced).map_err(|_| first)
        }
    }
}

/// Turn strings such as `"8080"`, `"true"` or `"0.5"` into their JSON scalar.
fn coerce_scalars(value: &Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(s.trim()) {
            Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
            _ => match s.trim().to_lowercase().as_str() {
                "yes" | "on" => Value::Bool(true),
                "no" | "off" => Value::Bool(false),
                _ => value.clone(),
            },
        },
        Value::Array(items) => Value::Array(items.iter().map(coerce_scalars).collect()),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), coerce_scalars(v))).collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::TempDir;

    fn demo(tmp: &TempDir, format: ConfigFormat) -> ProjectConfig {
        let mapping = ConfigMapping::new()
            .with_section("Net", [("Port", "8080"), ("Host", "localhost"), ("Tls", "yes")])
            .with_section("Paths", [("Logs", "/var/log/demo")]);
        let path = tmp.path().join(format.file_name());
        ProjectConfig::create("demo", path, format, mapping).unwrap()
    }

    #[test]
    fn test_get_and_case_insensitive_lookup() {
        let tmp = TempDir::new().unwrap();
        let config = demo(&tmp, ConfigFormat::Ini);

        assert_eq!(config.get("Net", "Port").unwrap(), &json!("8080"));
        assert_eq!(config.get_str("NET", "port").unwrap(), "8080");
        assert!(config.contains("paths", "LOGS"));
        assert_eq!(config.sections(), vec!["Net", "Paths"]);
    }

    #[test]
    fn test_missing_section_and_key_errors() {
        let tmp = TempDir::new().unwrap();
        let config = demo(&tmp, ConfigFormat::Ini);

        let err = config.get("Db", "Url").unwrap_err();
        assert!(matches!(err, UtilitiesError::Config(ConfigError::Section { .. })));

        let err = config.get("Net", "Timeout").unwrap_err();
        assert!(matches!(
            err,
            UtilitiesError::Config(ConfigError::Key { ref section, ref key, .. })
                if section == "Net" && key == "Timeout"
        ));
    }

    #[test]
    fn test_typed_access_from_ini_strings() {
        #[derive(Deserialize)]
        struct Net {
            #[serde(rename = "Port")]
            port: u16,
            #[serde(rename = "Host")]
            host: String,
            #[serde(rename = "Tls")]
            tls: bool,
        }

        let tmp = TempDir::new().unwrap();
        let config = demo(&tmp, ConfigFormat::Ini);

        assert_eq!(config.get_as::<u16>("Net", "Port").unwrap(), 8080);
        assert_eq!(config.get_as::<String>("Net", "Port").unwrap(), "8080");
        assert!(config.get_as::<u16>("Net", "Host").is_err());

        let net: Net = config.section_as("net").unwrap();
        assert_eq!(net.port, 8080);
        assert_eq!(net.host, "localhost");
        assert!(net.tls);
    }

    #[test]
    fn test_set_persists_immediately() {
        let tmp = TempDir::new().unwrap();
        let mut config = demo(&tmp, ConfigFormat::Ini);

        config.set("net", "PORT", "9090").unwrap();
        config.set("Db", "Url", "sqlite://demo.db").unwrap();

        let on_disk = std::fs::read_to_string(config.path()).unwrap();
        assert!(on_disk.contains("[Net]\nPort = 9090\n"));
        assert!(on_disk.contains("[Db]\nUrl = sqlite://demo.db\n"));

        let reread =
            ProjectConfig::load("demo", config.path().to_path_buf(), ConfigFormat::Ini).unwrap();
        assert_eq!(reread.mapping(), config.mapping());
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let tmp = TempDir::new().unwrap();
        let mut config = demo(&tmp, ConfigFormat::Ini);
        let before = config.mapping().clone();

        // A key INI cannot express makes the save fail before touching disk.
        let err = config.set("Fresh", "bad=key", "1").unwrap_err();
        assert!(matches!(err, UtilitiesError::Config(ConfigError::Serialize { .. })));
        assert_eq!(config.mapping(), &before);
        assert_eq!(config.sections(), vec!["Net", "Paths"]);

        let err = config.set("Net", "bad=key", "1").unwrap_err();
        assert!(matches!(err, UtilitiesError::Config(ConfigError::Serialize { .. })));
        assert!(!config.contains("Net", "bad=key"));
        assert_eq!(config.get_str("Net", "Port").unwrap(), "8080");
    }

    #[test]
    fn test_unwritable_file_is_a_file_system_error() {
        let tmp = TempDir::new().unwrap();
        let mut config = demo(&tmp, ConfigFormat::Ini);
        let before = config.mapping().clone();

        // A directory where the file should be makes every write fail.
        std::fs::remove_file(config.path()).unwrap();
        std::fs::create_dir(config.path()).unwrap();

        let err = config.set("Net", "Port", "9090").unwrap_err();
        assert!(matches!(err, UtilitiesError::FileSystem(_)));
        assert_eq!(config.mapping(), &before);

        let err = config.set("Db", "Url", "sqlite://demo.db").unwrap_err();
        assert!(matches!(err, UtilitiesError::FileSystem(_)));
        assert_eq!(config.mapping(), &before);
        assert_eq!(config.sections(), vec!["Net", "Paths"]);
    }

    #[test]
    fn test_reload_discards_memory() {
        let tmp = TempDir::new().unwrap();
        let mut config = demo(&tmp, ConfigFormat::Json);

        std::fs::write(config.path(), "{\"Net\": {\"Port\": 1}}\n").unwrap();
        assert_eq!(config.get("Net", "Port").unwrap(), &json!("8080"));

        config.reload().unwrap();
        assert_eq!(config.get("Net", "Port").unwrap(), &json!(1));
        assert!(config.section("Paths").is_err());
    }
}
