//! Format backends
//!
//! Each backend translates between one on-disk text format and a
//! [`ConfigMapping`]. Backends are stateless; [`ConfigFormat::backend`]
//! hands out the one matching a format.
//!
//! - `ini`: section/`key = value` text, values are strings
//! - `json`: one object of objects
//! - `toml`: top-level tables
//! - `python`: `NAME = {...}` assignments of Python literals

use std::fs;
use std::path::Path;

use tracing::trace;

use crate::config::{ConfigFormat, ConfigMapping};
use crate::error::{FileSystemError, Result};

mod ini;
mod json;
mod python;
mod toml;

pub use self::ini::IniBackend;
pub use self::json::JsonBackend;
pub use self::python::PythonBackend;
pub use self::toml::TomlBackend;

pub trait FormatBackend: Send + Sync {
    fn format(&self) -> ConfigFormat;

    /// Parse text already read from `path` (used for error messages).
    fn parse(&self, path: &Path, content: &str) -> Result<ConfigMapping>;

    /// Render a mapping to file content.
    fn render(&self, mapping: &ConfigMapping) -> Result<String>;

    fn load(&self, path: &Path) -> Result<ConfigMapping> {
        trace!("Reading {} file {}", self.format(), path.display());
        let content = fs::read_to_string(path).map_err(|e| FileSystemError::io(path, e))?;
        self.parse(path, &content)
    }

    fn save(&self, path: &Path, mapping: &ConfigMapping) -> Result<()> {
        trace!("Writing {} file {}", self.format(), path.display());
        let content = self.render(mapping)?;
        fs::write(path, content).map_err(|e| FileSystemError::io(path, e))?;
        Ok(())
    }
}
