use std::fmt::Write as _;
use std::path::Path;

use serde_json::Value;

use super::FormatBackend;
use crate::config::{ConfigFormat, ConfigMapping, Section};
use crate::error::{ConfigError, Result};

/// `[Section]` / `key = value` files. Keys keep their case.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniBackend;

struct RawSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl FormatBackend for IniBackend {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Ini
    }

    fn parse(&self, path: &Path, content: &str) -> Result<ConfigMapping> {
        let fail = |line: usize, reason: &str| -> crate::error::UtilitiesError {
            ConfigError::parse(path, ConfigFormat::Ini, format!("line {}: {}", line, reason)).into()
        };

        let mut sections: Vec<RawSection> = Vec::new();
        // Set while the previous line was a `key = value` that may continue.
        let mut continuing = false;

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            // Indented lines extend the previous value, blank and `#` ones included.
            let indented = raw.starts_with(' ') || raw.starts_with('\t');
            if indented && continuing {
                if let Some((_, value)) = sections.last_mut().and_then(|s| s.entries.last_mut()) {
                    value.push('\n');
                    value.push_str(line);
                    continue;
                }
            }

            if line.is_empty() {
                continuing = false;
                continue;
            }
            if line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim();
                if name.is_empty() {
                    return Err(fail(line_no, "empty section name"));
                }
                if sections.iter().any(|s| s.name == name) {
                    return Err(fail(line_no, &format!("duplicate section '{}'", name)));
                }
                sections.push(RawSection {
                    name: name.to_string(),
                    entries: Vec::new(),
                });
                continuing = false;
                continue;
            }

            let Some(section) = sections.last_mut() else {
                return Err(fail(line_no, "key found before any [section] header"));
            };
            let Some(pos) = line.find(|c: char| c == '=' || c == ':') else {
                return Err(fail(line_no, "expected 'key = value'"));
            };

            let key = line[..pos].trim();
            let value = line[pos + 1..].trim();
            if key.is_empty() {
                return Err(fail(line_no, "missing key before delimiter"));
            }
            if section.entries.iter().any(|(k, _)| k == key) {
                return Err(fail(
                    line_no,
                    &format!("duplicate key '{}' in section '{}'", key, section.name),
                ));
            }

            section.entries.push((key.to_string(), value.to_string()));
            continuing = true;
        }

        let mut mapping = ConfigMapping::new();
        for section in sections {
            let values: Section = section
                .entries
                .into_iter()
                .map(|(k, v)| {
                    let v = v.trim_end_matches('\n');
                    (k, Value::String(unquote(v).to_string()))
                })
                .collect();
            mapping.insert_section(section.name, values);
        }
        Ok(mapping)
    }

    fn render(&self, mapping: &ConfigMapping) -> Result<String> {
        let mut out = String::new();

        for (name, section) in mapping.sections() {
            if name.is_empty() || name.contains(['\n', '\r', ']']) {
                return Err(ConfigError::serialize(
                    ConfigFormat::Ini,
                    format!("section name {:?} cannot be written as an INI header", name),
                )
                .into());
            }
            let _ = writeln!(out, "[{}]", name);

            for (key, value) in section {
                let key_ok = !key.trim().is_empty()
                    && key.trim() == key
                    && !key.contains(['=', ':', '\n', '\r'])
                    && !key.starts_with(['[', '#', ';']);
                if !key_ok {
                    return Err(ConfigError::serialize(
                        ConfigFormat::Ini,
                        format!("key {:?} in section '{}' cannot be written as INI", key, name),
                    )
                    .into());
                }

                let text = value_text(value).replace("\r\n", "\n").replace('\n', "\n\t");
                if text.is_empty() {
                    let _ = writeln!(out, "{} =", key);
                } else {
                    let _ = writeln!(out, "{} = {}", key, text);
                }
            }
            out.push('\n');
        }

        Ok(out)
    }
}

/// `"quoted"` values lose their surrounding double quotes.
fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn parse(content: &str) -> Result<ConfigMapping> {
        IniBackend.parse(&PathBuf::from("config.ini"), content)
    }

    #[test]
    fn test_render_matches_configparser_layout() {
        let mapping = ConfigMapping::new()
            .with_section("Net", [("Port", "8080"), ("Host", "localhost")])
            .with_section("Paths", [("Logs", "/var/log/demo")]);

        let text = IniBackend.render(&mapping).unwrap();

        assert_eq!(
            text,
            "[Net]\nPort = 8080\nHost = localhost\n\n[Paths]\nLogs = /var/log/demo\n\n"
        );
    }

    #[test]
    fn test_parse_comments_delimiters_and_case() {
        let mapping = parse(
            "# leading comment\n[Net]\nPort = 8080\n; another\nHostName: example.org\n\n[Empty]\n",
        )
        .unwrap();

        assert_eq!(mapping.section_names(), vec!["Net", "Empty"]);
        assert_eq!(mapping.get("Net", "Port"), Some(&json!("8080")));
        assert_eq!(mapping.get("Net", "HostName"), Some(&json!("example.org")));
        assert!(mapping.section("Empty").unwrap().is_empty());
    }

    #[test]
    fn test_parse_strips_double_quotes() {
        let mapping = parse("[A]\nname = \"quoted value\"\nlone = \"\n").unwrap();
        assert_eq!(mapping.get("A", "name"), Some(&json!("quoted value")));
        assert_eq!(mapping.get("A", "lone"), Some(&json!("\"")));
    }

    #[test]
    fn test_multiline_values_round_trip() {
        let mapping = ConfigMapping::new()
            .with_section("Msg", [("Body", "first\nsecond"), ("After", "x")]);

        let text = IniBackend.render(&mapping).unwrap();
        assert!(text.contains("Body = first\n\tsecond\n"));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_blank_lines_inside_values_round_trip() {
        let mapping = ConfigMapping::new()
            .with_section("Net", [("Motd", "hello\n\nworld"), ("Port", "8080")]);

        let text = IniBackend.render(&mapping).unwrap();
        assert!(text.contains("Motd = hello\n\t\n\tworld\n"));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_comment_like_value_lines_are_kept() {
        let mapping = ConfigMapping::new()
            .with_section("Net", [("Motd", "hello\n# world\n; again"), ("Port", "8080")]);

        let parsed = parse(&IniBackend.render(&mapping).unwrap()).unwrap();

        assert_eq!(parsed.get("Net", "Motd"), Some(&json!("hello\n# world\n; again")));
        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_trailing_blank_continuation_lines_are_dropped() {
        let mapping = parse("[Net]\nMotd = hello\n\t\n  \n[Db]\nUrl = x\n").unwrap();

        assert_eq!(mapping.get("Net", "Motd"), Some(&json!("hello")));
        assert_eq!(mapping.get("Db", "Url"), Some(&json!("x")));
    }

    #[test]
    fn test_value_containing_delimiters_round_trips() {
        let mapping = ConfigMapping::new()
            .with_section("Db", [("Url", "postgres://u:p@host:5432/db?a=b"), ("Empty", "")]);

        let parsed = parse(&IniBackend.render(&mapping).unwrap()).unwrap();

        assert_eq!(parsed, mapping);
    }

    #[test]
    fn test_non_string_values_are_written_as_text() {
        let mapping =
            ConfigMapping::from_json(json!({"Net": {"Port": 8080, "Tls": true}})).unwrap();

        let text = IniBackend.render(&mapping).unwrap();

        assert!(text.contains("Port = 8080\n"));
        assert!(text.contains("Tls = true\n"));
    }

    #[test]
    fn test_malformed_files_are_parse_errors() {
        for content in [
            "Port = 8080\n",
            "[Net]\njust some words\n",
            "[Net]\nPort = 1\n[Net]\n",
            "[Net]\nPort = 1\nPort = 2\n",
            "[ ]\n",
        ] {
            let err = parse(content).unwrap_err();
            assert!(
                matches!(err, crate::error::UtilitiesError::Config(ConfigError::Parse { .. })),
                "expected parse error for {:?}",
                content
            );
        }
    }

    #[test]
    fn test_unwritable_names_are_rejected() {
        let bad_key = ConfigMapping::new().with_section("Net", [("a=b", "1")]);
        assert!(IniBackend.render(&bad_key).is_err());

        let bad_section = ConfigMapping::new().with_section("a]b", [("k", "1")]);
        assert!(IniBackend.render(&bad_section).is_err());
    }
}
