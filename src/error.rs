//! Error handling for the utilities crate
//!
//! Errors are grouped by concern (file system, configuration) and composed
//! into [`UtilitiesError`], which every public operation returns through the
//! crate-wide [`Result`] alias.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ConfigFormat;

#[derive(Error, Debug)]
pub enum UtilitiesError {
    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup error: {0}")]
    Logging(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Home directory could not be determined")]
    HomeDirUnavailable,
}

impl FileSystemError {
    /// Attach the offending path to an IO error.
    pub fn io(path: impl AsRef<Path>, err: std::io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => FileSystemError::PermissionDenied { path },
            _ => FileSystemError::Io { path, source: err },
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed {format} config {path}: {reason}")]
    Parse {
        path: PathBuf,
        format: ConfigFormat,
        reason: String,
    },

    #[error("No configuration named '{name}' (looked in {folder})")]
    NotFound { name: String, folder: PathBuf },

    #[error("Section '{section}' not found in configuration '{name}'")]
    Section { name: String, section: String },

    #[error("Key '{key}' not found in section '{section}' of configuration '{name}'")]
    Key {
        name: String,
        section: String,
        key: String,
    },

    #[error("Cannot write {format} config: {reason}")]
    Serialize { format: ConfigFormat, reason: String },

    #[error("Invalid configuration name: '{name}'")]
    InvalidName { name: String },

    #[error("Unsupported config file type: {extension}")]
    UnsupportedFormat { extension: String },
}

impl ConfigError {
    pub(crate) fn parse(path: &Path, format: ConfigFormat, reason: impl Into<String>) -> Self {
        ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            reason: reason.into(),
        }
    }

    pub(crate) fn serialize(format: ConfigFormat, reason: impl Into<String>) -> Self {
        ConfigError::Serialize {
            format,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, UtilitiesError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_permission_denied_is_classified() {
        let denied = Error::new(ErrorKind::PermissionDenied, "nope");
        let err = FileSystemError::io("/root/locked", denied);
        assert!(matches!(err, FileSystemError::PermissionDenied { .. }));

        let err = FileSystemError::io("/tmp/x", Error::new(ErrorKind::Other, "disk full"));
        assert!(matches!(err, FileSystemError::Io { .. }));
    }

    #[test]
    fn test_key_error_message_names_everything() {
        let err = UtilitiesError::from(ConfigError::Key {
            name: "demo".into(),
            section: "Net".into(),
            key: "Host".into(),
        });
        let message = err.to_string();
        assert!(message.contains("Host"));
        assert!(message.contains("Net"));
        assert!(message.contains("demo"));
    }
}
