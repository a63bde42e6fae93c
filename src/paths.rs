//! Per-project storage folders under the user's home directory
//!
//! Everything this crate writes lives below one root, `<home>/utilities` by
//! default (`UTILITIES_HOME` overrides it). Each project gets its own folder
//! holding its config file and its `logs/` directory.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::env::{EnvParser, EnvVars};
use crate::config::validation::ConfigValidator;
use crate::error::{FileSystemError, Result};

/// Folder created under the home directory when no root is configured.
pub const BASE_FOLDER_NAME: &str = "utilities";

/// Resolves where project folders live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Use an explicit root, e.g. a temporary directory in tests.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root from `UTILITIES_HOME`, falling back to `<home>/utilities`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        if let Some(root) = EnvParser::parse_path(EnvVars::UTILITIES_HOME, false)? {
            return Ok(Self::with_root(root));
        }

        Self::home_default()
    }

    /// `<home>/utilities`, ignoring the environment.
    pub fn home_default() -> Result<Self> {
        let home = dirs::home_dir().ok_or(FileSystemError::HomeDirUnavailable)?;
        Ok(Self::with_root(home.join(BASE_FOLDER_NAME)))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The root folder, created if it does not exist yet.
    pub fn base_directory(&self) -> Result<PathBuf> {
        ensure_dir(&self.root)?;
        Ok(self.root.clone())
    }

    /// Folder for `name` without touching the file system.
    pub fn project_path(&self, name: &str) -> Result<PathBuf> {
        let folder = normalize_name(name)?;
        Ok(self.root.join(folder))
    }

    /// Folder for `name`, created (with the root) if absent.
    pub fn project_folder(&self, name: &str) -> Result<PathBuf> {
        let path = self.project_path(name)?;
        self.base_directory()?;
        ensure_dir(&path)?;
        Ok(path)
    }
}

/// Root folder resolved from the environment, created if needed.
pub fn base_directory() -> Result<PathBuf> {
    Paths::from_env()?.base_directory()
}

/// Project folder resolved from the environment, created if needed.
pub fn project_folder(name: &str) -> Result<PathBuf> {
    Paths::from_env()?.project_folder(name)
}

/// Folder name used on disk for a project: trimmed, lowercase, `_` for spaces.
pub fn normalize_name(name: &str) -> Result<String> {
    ConfigValidator::validate_project_name(name)?;
    Ok(name.trim().to_lowercase().replace(' ', "_"))
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.is_dir() {
        debug!("Creating directory {}", path.display());
        fs::create_dir_all(path).map_err(|e| FileSystemError::io(path, e))?;
    }
    Ok(())
}
