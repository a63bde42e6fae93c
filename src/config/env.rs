use std::env;
use std::path::PathBuf;
use crate::error::{Result, UtilitiesError};

/// Environment variable configuration constants
pub struct EnvVars;

impl EnvVars {
    pub const UTILITIES_HOME: &'static str = "UTILITIES_HOME";
    pub const CONFIG_FORMAT: &'static str = "UTILITIES_CONFIG_FORMAT";

    pub const LOG_PROJECT: &'static str = "LOG_PROJECT";
    pub const LOG_LEVEL: &'static str = "LOG_LEVEL";
    pub const LOG_DIR: &'static str = "LOG_DIR";
    pub const LOG_JSON: &'static str = "LOG_JSON";
    pub const LOG_CONSOLE: &'static str = "LOG_CONSOLE";
    pub const LOG_RETENTION_DAYS: &'static str = "LOG_RETENTION_DAYS";
}

/// Environment variable parsing utilities with validation
pub struct EnvParser;

impl EnvParser {
    /// Parse environment variable as string with validation
    pub fn parse_string(
        var_name: &str,
        validator: Option<fn(&str) -> Result<()>>,
    ) -> Result<Option<String>> {
        match env::var(var_name) {
            Ok(value) => Self::clean(var_name, Some(value), validator),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(env::VarError::NotUnicode(_)) => {
                Err(UtilitiesError::Validation(format!(
                    "Environment variable {} contains invalid UTF-8",
                    var_name
                )))
            }
        }
    }

    /// Trim a raw value; blank counts as unset.
    pub fn clean(
        var_name: &str,
        value: Option<String>,
        validator: Option<fn(&str) -> Result<()>>,
    ) -> Result<Option<String>> {
        let Some(value) = value else {
            return Ok(None);
        };

        let trimmed = value.trim().to_string();
        if trimmed.is_empty() {
            return Ok(None);
        }

        if let Some(validate_fn) = validator {
            validate_fn(&trimmed).map_err(|e| {
                UtilitiesError::Validation(format!("{}: {}", var_name, e))
            })?;
        }

        Ok(Some(trimmed))
    }

    /// Parse environment variable as PathBuf with validation
    pub fn parse_path(var_name: &str, should_exist: bool) -> Result<Option<PathBuf>> {
        if let Some(path_str) = Self::parse_string(var_name, None)? {
            let path = PathBuf::from(path_str);

            if should_exist && !path.exists() {
                return Err(UtilitiesError::Validation(format!(
                    "Path specified in {} does not exist: {}",
                    var_name,
                    path.display()
                )));
            }

            Ok(Some(path))
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as boolean with validation
    pub fn parse_bool(var_name: &str) -> Result<Option<bool>> {
        let value = Self::parse_string(var_name, None)?;
        Self::bool_value(var_name, value)
    }

    /// Interpret an already-read value as a boolean flag.
    pub fn bool_value(var_name: &str, value: Option<String>) -> Result<Option<bool>> {
        if let Some(value_str) = Self::clean(var_name, value, None)? {
            match value_str.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(UtilitiesError::Validation(format!(
                    "Invalid boolean value in {}: '{}'. Use: true/false, 1/0, yes/no, on/off",
                    var_name, value_str
                )))
            }
        } else {
            Ok(None)
        }
    }

    /// Parse environment variable as u64 with range validation
    pub fn parse_u64(var_name: &str, min: u64, max: u64) -> Result<Option<u64>> {
        let value = Self::parse_string(var_name, None)?;
        Self::u64_value(var_name, value, min, max)
    }

    /// Interpret an already-read value as a bounded integer.
    pub fn u64_value(
        var_name: &str,
        value: Option<String>,
        min: u64,
        max: u64,
    ) -> Result<Option<u64>> {
        if let Some(value_str) = Self::clean(var_name, value, None)? {
            let value = value_str.parse::<u64>().map_err(|_| {
                UtilitiesError::Validation(format!(
                    "Invalid number in {}: '{}'. Must be a positive integer",
                    var_name, value_str
                ))
            })?;

            if value < min || value > max {
                return Err(UtilitiesError::Validation(format!(
                    "Value in {} must be between {} and {}, got {}",
                    var_name, min, max, value
                )));
            }

            Ok(Some(value))
        } else {
            Ok(None)
        }
    }
}
