use std::env;
use std::path::{Path, PathBuf};
use crate::error::{Result, UtilitiesError};
use crate::config::env::{EnvVars, EnvParser};
use crate::config::{ConfigFormat, ConfigStore};
use crate::paths::Paths;

/// Store builder with validation of every override
#[derive(Debug, Default)]
pub struct StoreBuilder {
    root: Option<PathBuf>,
    format: Option<ConfigFormat>,
}

impl StoreBuilder {
    /// Create a new store builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the folder holding all project folders
    pub fn root<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(UtilitiesError::Validation("Store root cannot be empty".to_string()));
        }
        if path.is_file() {
            return Err(UtilitiesError::Validation(format!(
                "Store root is a file: {}",
                path.display()
            )));
        }
        self.root = Some(path.to_path_buf());
        Ok(self)
    }

    /// Set the format used when a project file is created
    pub fn format(mut self, format: ConfigFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Load values from environment variables with validation
    pub fn load_from_env(self) -> Result<Self> {
        dotenvy::dotenv().ok();
        self.apply_env_from(|var| env::var(var).ok())
    }

    /// Same as [`StoreBuilder::load_from_env`] with a custom variable source.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Root folder
        let root = lookup(EnvVars::UTILITIES_HOME);
        let root = EnvParser::clean(EnvVars::UTILITIES_HOME, root, None)?;
        if let Some(root) = root {
            self = self.root(root)?;
        }

        // First-run format
        let format = lookup(EnvVars::CONFIG_FORMAT);
        let format = EnvParser::clean(EnvVars::CONFIG_FORMAT, format, None)?;
        if let Some(format) = format {
            let format = format.parse::<ConfigFormat>().map_err(|e| {
                UtilitiesError::Validation(format!("{}: {}", EnvVars::CONFIG_FORMAT, e))
            })?;
            self = self.format(format);
        }

        Ok(self)
    }

    /// Build the store with defaults
    pub fn build(self) -> Result<ConfigStore> {
        let paths = match self.root {
            Some(root) => Paths::with_root(root),
            None => Paths::home_default()?,
        };

        Ok(ConfigStore::with_format(paths, self.format.unwrap_or_default()))
    }
}

impl ConfigStore {
    /// Store configured from `UTILITIES_HOME` and `UTILITIES_CONFIG_FORMAT`.
    pub fn from_env() -> Result<Self> {
        StoreBuilder::new().load_from_env()?.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_store_builder_basic() {
        let tmp = TempDir::new().unwrap();
        let store = StoreBuilder::new()
            .root(tmp.path())
            .unwrap()
            .format(ConfigFormat::Toml)
            .build()
            .unwrap();

        assert_eq!(store.paths().root(), tmp.path());
        assert_eq!(store.default_format(), ConfigFormat::Toml);
    }

    #[test]
    fn test_store_builder_validation() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("plain.txt");
        std::fs::write(&file, "x").unwrap();

        let result = StoreBuilder::new().root(&file).unwrap_err();
        assert!(matches!(result, UtilitiesError::Validation(_)));

        let result = StoreBuilder::new().root("").unwrap_err();
        assert!(matches!(result, UtilitiesError::Validation(_)));
    }

    #[test]
    fn test_store_builder_from_env() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("custom");
        let root_str = root.to_string_lossy().to_string();

        let store = StoreBuilder::new()
            .apply_env_from(lookup(&[
                ("UTILITIES_HOME", root_str.as_str()),
                ("UTILITIES_CONFIG_FORMAT", " JSON "),
            ]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(store.paths().root(), root.as_path());
        assert_eq!(store.default_format(), ConfigFormat::Json);
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let builder = StoreBuilder::new()
            .format(ConfigFormat::Python)
            .apply_env_from(lookup(&[("UTILITIES_CONFIG_FORMAT", "   ")]))
            .unwrap();

        assert_eq!(builder.format, Some(ConfigFormat::Python));
        assert!(builder.root.is_none());
    }

    #[test]
    fn test_unknown_format_in_env_is_rejected() {
        let err = StoreBuilder::new()
            .apply_env_from(lookup(&[("UTILITIES_CONFIG_FORMAT", "yaml")]))
            .unwrap_err();

        assert!(matches!(
            err,
            UtilitiesError::Validation(ref msg) if msg.contains("UTILITIES_CONFIG_FORMAT")
        ));
    }
}
