use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, UtilitiesError};

/// A single configuration value. INI files only ever produce strings.
pub type ConfigValue = Value;

/// Ordered key/value pairs of one section.
pub type Section = Map<String, Value>;

/// In-memory mirror of one configuration file: section -> key -> value.
///
/// Sections and keys keep insertion order so files written back stay
/// readable. Lookups through [`ConfigMapping::resolve_section`] and
/// [`ConfigMapping::resolve_key`] fall back to a case-insensitive match when no
/// exact name exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfigMapping {
    sections: Map<String, Value>,
}

impl ConfigMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object of objects, e.g. `json!({"Net": {"Port": "8080"}})`.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_map(map).map_err(UtilitiesError::Validation),
            other => Err(UtilitiesError::Validation(format!(
                "expected an object of sections, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Checks that every top-level value is a table; the reason is returned on failure.
    pub(crate) fn from_map(map: Map<String, Value>) -> std::result::Result<Self, String> {
        if let Some((name, value)) = map.iter().find(|(_, v)| !v.is_object()) {
            return Err(format!(
                "section '{}' must be a table of keys, got {}",
                name,
                json_kind(value)
            ));
        }
        Ok(Self { sections: map })
    }

    /// Builder-style helper for default schemas.
    pub fn with_section<N, K, V, I>(mut self, name: N, entries: I) -> Self
    where
        N: Into<String>,
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let section: Section = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert_section(name, section);
        self
    }

    /// Insert or replace a whole section, returning the previous one.
    pub fn insert_section(&mut self, name: impl Into<String>, section: Section) -> Option<Section> {
        match self.sections.insert(name.into(), Value::Object(section)) {
            Some(Value::Object(previous)) => Some(previous),
            _ => None,
        }
    }

    pub fn remove_section(&mut self, name: &str) -> Option<Section> {
        match self.sections.shift_remove(name) {
            Some(Value::Object(previous)) => Some(previous),
            _ => None,
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name).and_then(Value::as_object)
    }

    pub fn section_mut(&mut self, name: &str) -> Option<&mut Section> {
        self.sections.get_mut(name).and_then(Value::as_object_mut)
    }

    /// Stored spelling of a section name, exact match first.
    pub fn resolve_section(&self, name: &str) -> Option<&str> {
        resolve(&self.sections, name)
    }

    /// Stored spelling of a key inside an (exactly named) section.
    pub fn resolve_key(&self, section: &str, key: &str) -> Option<&str> {
        resolve(self.section(section)?, key)
    }

    /// Exact lookup of one value.
    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.section(section)?.get(key)
    }

    /// Set a value, creating the section if needed. Returns the previous value.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<Value>) -> Option<Value> {
        if self.section(section).is_none() {
            self.insert_section(section, Section::new());
        }
        self.section_mut(section)
            .and_then(|s| s.insert(key.to_string(), value.into()))
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections
            .iter()
            .filter_map(|(name, v)| v.as_object().map(|s| (name.as_str(), s)))
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.sections.clone())
    }
}

impl TryFrom<Value> for ConfigMapping {
    type Error = UtilitiesError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_json(value)
    }
}

fn resolve<'a>(map: &'a Map<String, Value>, wanted: &str) -> Option<&'a str> {
    if let Some((exact, _)) = map.get_key_value(wanted) {
        return Some(exact.as_str());
    }
    let wanted = wanted.to_lowercase();
    map.keys().find(|n| n.to_lowercase() == wanted).map(String::as_str)
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a table",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_order() {
        let mapping = ConfigMapping::from_json(json!({
            "Zeta": {"b": "1", "a": "2"},
            "Alpha": {"x": "3"}
        }))
        .unwrap();

        assert_eq!(mapping.section_names(), vec!["Zeta", "Alpha"]);
        let keys: Vec<_> = mapping.section("Zeta").unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_from_json_rejects_non_table_sections() {
        assert!(ConfigMapping::from_json(json!({"Net": "8080"})).is_err());
        assert!(ConfigMapping::from_json(json!(["Net"])).is_err());
    }

    #[test]
    fn test_resolve_prefers_exact_then_case_insensitive() {
        let mapping = ConfigMapping::new()
            .with_section("PATHS", [("Config", "/tmp/c")])
            .with_section("paths", [("config", "/tmp/other")]);

        assert_eq!(mapping.resolve_section("paths"), Some("paths"));
        assert_eq!(mapping.resolve_section("Paths"), Some("PATHS"));
        assert_eq!(mapping.resolve_key("PATHS", "CONFIG"), Some("Config"));
        assert_eq!(mapping.resolve_section("Logs"), None);
    }

    #[test]
    fn test_set_creates_missing_section_at_end() {
        let mut mapping = ConfigMapping::new().with_section("Net", [("Port", "8080")]);

        assert_eq!(mapping.set("Net", "Port", "9090"), Some(json!("8080")));
        assert_eq!(mapping.set("Db", "Url", "sqlite://x"), None);

        assert_eq!(mapping.section_names(), vec!["Net", "Db"]);
        assert_eq!(mapping.get("Net", "Port"), Some(&json!("9090")));
    }

    #[test]
    fn test_remove_section_keeps_remaining_order() {
        let mut mapping = ConfigMapping::new()
            .with_section("A", [("k", 1)])
            .with_section("B", [("k", 2)])
            .with_section("C", [("k", 3)]);

        assert!(mapping.remove_section("B").is_some());
        assert_eq!(mapping.section_names(), vec!["A", "C"]);
    }
}
