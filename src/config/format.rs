use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::backends::{FormatBackend, IniBackend, JsonBackend, PythonBackend, TomlBackend};
use crate::error::{ConfigError, Result};

/// On-disk format of a project's config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConfigFormat {
    #[default]
    Ini,
    Json,
    Toml,
    Python,
}

impl ConfigFormat {
    /// Every supported format, in lookup order.
    pub const ALL: [ConfigFormat; 4] = [
        ConfigFormat::Ini,
        ConfigFormat::Json,
        ConfigFormat::Toml,
        ConfigFormat::Python,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Ini => "ini",
            ConfigFormat::Json => "json",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Python => "py",
        }
    }

    /// `config.<ext>`
    pub fn file_name(self) -> String {
        format!("config.{}", self.extension())
    }

    pub fn from_extension(extension: &str) -> Result<Self> {
        let extension = extension.trim_start_matches('.').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == extension)
            .ok_or_else(|| ConfigError::UnsupportedFormat { extension }.into())
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(extension)
    }

    /// The read/write adapter for this format.
    pub fn backend(self) -> &'static dyn FormatBackend {
        match self {
            ConfigFormat::Ini => &IniBackend,
            ConfigFormat::Json => &JsonBackend,
            ConfigFormat::Toml => &TomlBackend,
            ConfigFormat::Python => &PythonBackend,
        }
    }

    /// Lookup order when probing a folder: `self` first, then the rest.
    pub fn search_order(self) -> impl Iterator<Item = ConfigFormat> {
        std::iter::once(self).chain(Self::ALL.into_iter().filter(move |f| *f != self))
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigFormat::Ini => "INI",
            ConfigFormat::Json => "JSON",
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Python => "Python module",
        };
        f.write_str(name)
    }
}

impl FromStr for ConfigFormat {
    type Err = crate::error::UtilitiesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(ConfigFormat::Python),
            other => Self::from_extension(other),
        }
    }
}
