use crate::error::{ConfigError, Result, UtilitiesError};

/// Centralized configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// A project name must map to exactly one folder below the root.
    pub fn validate_project_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        let is_path_like = trimmed.contains('/')
            || trimmed.contains('\\')
            || trimmed == "."
            || trimmed == "..";

        if trimmed.is_empty() || is_path_like {
            return Err(ConfigError::InvalidName { name: name.to_string() }.into());
        }
        Ok(())
    }

    /// Validate numeric range
    pub fn validate_range<T>(value: T, min: T, max: T, field_name: &str) -> Result<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(UtilitiesError::Validation(format!(
                "{} must be between {} and {}, got {}",
                field_name, min, max, value
            )));
        }
        Ok(())
    }

    /// Whether `name` can appear on the left of a Python assignment.
    pub fn is_python_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c == '_' || c.is_alphabetic() => {}
            _ => return false,
        }
        chars.all(|c| c == '_' || c.is_alphanumeric()) && !PYTHON_KEYWORDS.contains(&name)
    }

    /// Validate a module path used for a dedicated log file (`app.net.client`).
    pub fn validate_module_path(module: &str) -> Result<()> {
        let valid = !module.is_empty()
            && module
                .split("::")
                .flat_map(|part| part.split('.'))
                .all(|part| {
                    !part.is_empty()
                        && part.chars().all(|c| c == '_' || c == '-' || c.is_alphanumeric())
                });

        if !valid {
            return Err(UtilitiesError::Validation(format!(
                "Invalid module path for log watch: '{}'",
                module
            )));
        }
        Ok(())
    }
}

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_name() {
        assert!(ConfigValidator::validate_project_name("demo").is_ok());
        assert!(ConfigValidator::validate_project_name("My Project").is_ok());
        assert!(ConfigValidator::validate_project_name("").is_err());
        assert!(ConfigValidator::validate_project_name("../etc").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(ConfigValidator::validate_range(5u64, 1u64, 10u64, "test").is_ok());
        assert!(ConfigValidator::validate_range(15u64, 1u64, 10u64, "test").is_err());
        assert!(ConfigValidator::validate_range(0u64, 1u64, 10u64, "test").is_err());
    }

    #[test]
    fn test_python_identifier() {
        assert!(ConfigValidator::is_python_identifier("PATHS"));
        assert!(ConfigValidator::is_python_identifier("_private"));
        assert!(!ConfigValidator::is_python_identifier("2fast"));
        assert!(!ConfigValidator::is_python_identifier("has space"));
        assert!(!ConfigValidator::is_python_identifier("class"));
    }

    #[test]
    fn test_validate_module_path() {
        assert!(ConfigValidator::validate_module_path("nav.module.sub").is_ok());
        assert!(ConfigValidator::validate_module_path("nav::net").is_ok());
        assert!(ConfigValidator::validate_module_path("nav..sub").is_err());
        assert!(ConfigValidator::validate_module_path("").is_err());
    }
}
