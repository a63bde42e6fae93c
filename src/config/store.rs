use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::{ConfigFormat, ConfigMapping, ConfigValue, ProjectConfig};
use crate::error::{ConfigError, Result};
use crate::paths::{normalize_name, Paths};

/// Registry of loaded project configurations.
///
/// Construct one per application (see [`crate::config::StoreBuilder`]) and
/// pass it to whatever needs configuration. A name is read from disk at most
/// once per store; later calls reuse the cached [`ProjectConfig`] until
/// [`ConfigStore::reset`] drops it. Mutation goes through `&mut self`, so
/// sharing a store between threads needs the caller's own lock.
#[derive(Debug)]
pub struct ConfigStore {
    paths: Paths,
    default_format: ConfigFormat,
    entries: HashMap<String, ProjectConfig>,
}

impl ConfigStore {
    pub fn new(paths: Paths) -> Self {
        Self::with_format(paths, ConfigFormat::default())
    }

    pub fn with_format(paths: Paths, default_format: ConfigFormat) -> Self {
        Self {
            paths,
            default_format,
            entries: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn default_format(&self) -> ConfigFormat {
        self.default_format
    }

    /// Load `name` if a file exists, otherwise create it from `default_schema`
    /// in the store's default format. Safe to call on every start-up.
    pub fn ensure_initialized(
        &mut self,
        name: &str,
        default_schema: ConfigMapping,
    ) -> Result<&mut ProjectConfig> {
        let format = self.default_format;
        self.ensure_initialized_as(name, default_schema, format)
    }

    /// Like [`ConfigStore::ensure_initialized`] with an explicit format for a
    /// first-run file. An existing file in another format still wins.
    pub fn ensure_initialized_as(
        &mut self,
        name: &str,
        default_schema: ConfigMapping,
        format: ConfigFormat,
    ) -> Result<&mut ProjectConfig> {
        let key = normalize_name(name)?;

        if !self.entries.contains_key(&key) {
            let config = match self.find_existing(&key, format)? {
                Some((path, found)) => ProjectConfig::load(name, path, found)?,
                None => {
                    let folder = self.paths.project_folder(&key)?;
                    let path = folder.join(format.file_name());
                    info!("Creating {} config for '{}' at {}", format, name, path.display());
                    ProjectConfig::create(name, path, format, default_schema)?
                }
            };
            self.entries.insert(key.clone(), config);
        }

        self.cached(&key)
    }

    /// The cached configuration for `name`, reading it from disk on first use.
    pub fn get_or_load(&mut self, name: &str) -> Result<&mut ProjectConfig> {
        let key = normalize_name(name)?;

        if !self.entries.contains_key(&key) {
            let (path, format) = self
                .find_existing(&key, self.default_format)?
                .ok_or_else(|| ConfigError::NotFound {
                    name: name.to_string(),
                    folder: self.paths.root().join(&key),
                })?;
            let config = ProjectConfig::load(name, path, format)?;
            self.entries.insert(key.clone(), config);
        }

        self.cached(&key)
    }

    /// Read one value of one project.
    pub fn get(&mut self, name: &str, section: &str, key: &str) -> Result<ConfigValue> {
        Ok(self.get_or_load(name)?.get(section, key)?.clone())
    }

    /// Write one value of one project and persist it.
    pub fn set(
        &mut self,
        name: &str,
        section: &str,
        key: &str,
        value: impl Into<ConfigValue>,
    ) -> Result<()> {
        self.get_or_load(name)?.set(section, key, value)
    }

    /// Forget the cached entry; returns whether one existed.
    pub fn reset(&mut self, name: &str) -> bool {
        match normalize_name(name) {
            Ok(key) => self.entries.remove(&key).is_some(),
            Err(_) => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        normalize_name(name)
            .map(|key| self.entries.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn loaded_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.values().map(ProjectConfig::name).collect();
        names.sort_unstable();
        names
    }

    fn cached(&mut self, key: &str) -> Result<&mut ProjectConfig> {
        self.entries.get_mut(key).ok_or_else(|| {
            ConfigError::NotFound {
                name: key.to_string(),
                folder: self.paths.root().join(key),
            }
            .into()
        })
    }

    /// First `config.<ext>` present in the project folder, preferred format first.
    fn find_existing(
        &self,
        key: &str,
        preferred: ConfigFormat,
    ) -> Result<Option<(PathBuf, ConfigFormat)>> {
        let folder = self.paths.project_path(key)?;
        for format in preferred.search_order() {
            let path = folder.join(format.file_name());
            if path.is_file() {
                debug!("Found {} config for '{}' at {}", format, key, path.display());
                return Ok(Some((path, format)));
            }
        }
        Ok(None)
    }
}
