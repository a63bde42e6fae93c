use std::fmt::Write as _;
use std::path::Path;

use serde_json::{Map, Number, Value};

use super::FormatBackend;
use crate::config::mapping::json_kind;
use crate::config::validation::ConfigValidator;
use crate::config::{ConfigFormat, ConfigMapping};
use crate::error::{ConfigError, Result};

const HEADER: &str = "# Configuration module: plain literal assignments only.\n";

/// Python source made of `NAME = {...}` assignments.
///
/// Only literals are understood (dicts, lists, tuples, strings, numbers,
/// `True`, `False`, `None`); nothing is executed. Names starting with `_` are
/// private and skipped on load.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonBackend;

impl FormatBackend for PythonBackend {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Python
    }

    fn parse(&self, path: &Path, content: &str) -> Result<ConfigMapping> {
        let mut parser = Parser::new(content);
        let mut map = Map::new();

        let fail = |parser: &Parser, reason: String| -> crate::error::UtilitiesError {
            let reason = format!("line {}: {}", parser.line, reason);
            ConfigError::parse(path, ConfigFormat::Python, reason).into()
        };

        loop {
            parser.skip_blank_lines();
            if parser.at_end() {
                break;
            }

            let name = parser.identifier().map_err(|r| fail(&parser, r))?;
            parser.skip_inline_space();
            if !parser.eat('=') || parser.peek() == Some('=') {
                return Err(fail(&parser, format!("expected '{} = <literal>'", name)));
            }
            parser.skip_inline_space();
            let value = parser.literal().map_err(|r| fail(&parser, r))?;
            parser.end_of_statement().map_err(|r| fail(&parser, r))?;

            if name.starts_with('_') {
                continue;
            }
            if !value.is_object() {
                return Err(fail(
                    &parser,
                    format!("'{}' must be a dict of settings, got {}", name, json_kind(&value)),
                ));
            }
            map.insert(name, value);
        }

        ConfigMapping::from_map(map)
            .map_err(|reason| ConfigError::parse(path, ConfigFormat::Python, reason).into())
    }

    fn render(&self, mapping: &ConfigMapping) -> Result<String> {
        let mut out = String::from(HEADER);

        for (name, section) in mapping.sections() {
            if !ConfigValidator::is_python_identifier(name) || name.starts_with('_') {
                return Err(ConfigError::serialize(
                    ConfigFormat::Python,
                    format!("section name '{}' is not a public Python identifier", name),
                )
                .into());
            }

            out.push('\n');
            if section.is_empty() {
                let _ = writeln!(out, "{} = {{}}", name);
                continue;
            }

            let _ = writeln!(out, "{} = {{", name);
            for (key, value) in section {
                let _ = writeln!(out, "    {}: {},", quote(key), literal(value));
            }
            out.push_str("}\n");
        }

        Ok(out)
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(literal).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", quote(k), literal(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

type ParseResult<T> = std::result::Result<T, String>;

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Parser {
    fn new(content: &str) -> Self {
        Self {
            chars: content.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_comment(&mut self) {
        if self.peek() == Some('#') {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.bump();
            }
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t')) {
            self.bump();
        }
    }

    /// Whitespace, newlines and comments between statements or inside brackets.
    fn skip_blank_lines(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r' | '\n') => {
                    self.bump();
                }
                Some('#') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn end_of_statement(&mut self) -> ParseResult<()> {
        self.skip_inline_space();
        self.skip_comment();
        self.eat('\r');
        match self.peek() {
            None => Ok(()),
            Some('\n') => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(format!("unexpected '{}' after assignment", c)),
        }
    }

    fn identifier(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        if name.is_empty() || !ConfigValidator::is_python_identifier(&name) {
            let found = self.peek().map(String::from).unwrap_or_else(|| "end of file".into());
            return Err(format!("expected an assignment, found '{}{}'", name, found));
        }
        Ok(name)
    }

    fn literal(&mut self) -> ParseResult<Value> {
        match self.peek() {
            Some('{') => self.dict(),
            Some('[') => self.sequence('[', ']'),
            Some('(') => self.sequence('(', ')'),
            Some('"' | '\'') => self.string().map(Value::String),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let word = self.identifier_or_keyword();
                match word.as_str() {
                    "True" => Ok(Value::Bool(true)),
                    "False" => Ok(Value::Bool(false)),
                    "None" => Ok(Value::Null),
                    other => Err(format!("'{}' is not a literal", other)),
                }
            }
            Some(c) => Err(format!("unexpected '{}'", c)),
            None => Err("unexpected end of file".to_string()),
        }
    }

    fn identifier_or_keyword(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c == '_' || c.is_alphanumeric()) {
            self.bump();
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn dict(&mut self) -> ParseResult<Value> {
        self.bump();
        let mut map = Map::new();
        loop {
            self.skip_blank_lines();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }

            let key = match self.literal()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                other => {
                    return Err(format!("dict keys must be strings, got {}", json_kind(&other)))
                }
            };
            self.skip_blank_lines();
            if !self.eat(':') {
                return Err(format!("expected ':' after key '{}'", key));
            }
            self.skip_blank_lines();
            let value = self.literal()?;
            map.insert(key, value);

            self.skip_blank_lines();
            if self.eat(',') {
                continue;
            }
            self.skip_blank_lines();
            if self.eat('}') {
                return Ok(Value::Object(map));
            }
            return Err("expected ',' or '}' in dict".to_string());
        }
    }

    fn sequence(&mut self, open: char, close: char) -> ParseResult<Value> {
        self.bump();
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_blank_lines();
            if self.eat(close) {
                break;
            }
            items.push(self.literal()?);
            self.skip_blank_lines();
            if self.eat(',') {
                saw_comma = true;
                continue;
            }
            if self.eat(close) {
                break;
            }
            return Err(format!("expected ',' or '{}'", close));
        }

        // `(x)` is a parenthesised value, not a tuple.
        if open == '(' && items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    fn string(&mut self) -> ParseResult<String> {
        let quote = self.bump().ok_or("unexpected end of file")?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        } else if self.peek() == Some(quote) {
            self.bump();
            return Ok(String::new());
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or("unterminated string")?;
            match c {
                '\\' => out.push(self.escape()?),
                '\n' if !triple => return Err("newline in single-quoted string".to_string()),
                c if c == quote => {
                    if !triple {
                        return Ok(out);
                    }
                    if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                        self.bump();
                        self.bump();
                        return Ok(out);
                    }
                    out.push(c);
                }
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self) -> ParseResult<char> {
        let c = self.bump().ok_or("unterminated escape")?;
        Ok(match c {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            '"' => '"',
            'x' => self.hex_char(2)?,
            'u' => self.hex_char(4)?,
            'U' => self.hex_char(8)?,
            other => return Err(format!("unsupported escape '\\{}'", other)),
        })
    }

    fn hex_char(&mut self, digits: usize) -> ParseResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or("invalid hex escape")?;
            code = code * 16 + d;
        }
        char::from_u32(code).ok_or_else(|| format!("invalid code point {:#x}", code))
    }

    fn number(&mut self) -> ParseResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '-' || c == '+')
                && matches!(self.chars.get(self.pos.wrapping_sub(1)), Some('e' | 'E'));
            if c.is_ascii_digit() || c == '_' || c == '.' || c == 'e' || c == 'E' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }

        let text: String = self.chars[start..self.pos].iter().filter(|c| **c != '_').collect();
        let is_float = text.contains(['.', 'e', 'E']);

        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::from(i));
            }
            if let Ok(u) = text.trim_start_matches('+').parse::<u64>() {
                return Ok(Value::from(u));
            }
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("invalid number '{}'", text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UtilitiesError;
    use serde_json::json;
    use std::path::PathBuf;

    fn parse(content: &str) -> Result<ConfigMapping> {
        PythonBackend.parse(&PathBuf::from("config.py"), content)
    }

    #[test]
    fn test_parse_typical_module() {
        let mapping = parse(
            r#"# settings for the TEST project
PATHS = {
    "CONFIG": "/home/me/utilities/config",   # trailing comment
    'LOGS': '/home/me/utilities/logs',
}

_helper = 42
LIMITS = {"retries": 3, "ratio": 0.5, "debug": False, "token": None,
          "hosts": ["a", "b"], "pair": (1, 2)}
"#,
        )
        .unwrap();

        assert_eq!(mapping.section_names(), vec!["PATHS", "LIMITS"]);
        assert_eq!(mapping.get("PATHS", "LOGS"), Some(&json!("/home/me/utilities/logs")));
        assert_eq!(mapping.get("LIMITS", "retries"), Some(&json!(3)));
        assert_eq!(mapping.get("LIMITS", "ratio"), Some(&json!(0.5)));
        assert_eq!(mapping.get("LIMITS", "debug"), Some(&json!(false)));
        assert_eq!(mapping.get("LIMITS", "token"), Some(&json!(null)));
        assert_eq!(mapping.get("LIMITS", "pair"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_round_trip() {
        let mapping = ConfigMapping::from_json(json!({
            "Net": {"Port": "8080", "Retries": -3, "Scale": 1.5, "Tls": true},
            "Text": {"Quote": "say \"hi\"\n\tthen\\leave", "Nested": {"a": [1, null]}},
            "Empty": {}
        }))
        .unwrap();

        let text = PythonBackend.render(&mapping).unwrap();
        assert!(text.contains("Net = {\n    \"Port\": \"8080\",\n"));
        assert!(text.contains("Empty = {}\n"));

        let parsed = parse(&text).unwrap();
        assert_eq!(parsed, mapping);
        assert_eq!(parsed.section_names(), vec!["Net", "Text", "Empty"]);
    }

    #[test]
    fn test_string_forms() {
        let source = "S = {'a': '', 'b': \"\"\"multi\nline\"\"\", 'c': '\\x41\\u00e9'}\n";
        let mapping = parse(source).unwrap();
        assert_eq!(mapping.get("S", "a"), Some(&json!("")));
        assert_eq!(mapping.get("S", "b"), Some(&json!("multi\nline")));
        assert_eq!(mapping.get("S", "c"), Some(&json!("Aé")));
    }

    #[test]
    fn test_code_is_rejected() {
        for content in [
            "import os\n",
            "A = os.environ\n",
            "A = {'k': 1} + {}\n",
            "A = 5\n",
            "A == {}\n",
            "A = {'k': 1\n",
            "def f():\n    pass\n",
        ] {
            let err = parse(content).unwrap_err();
            assert!(
                matches!(err, UtilitiesError::Config(ConfigError::Parse { .. })),
                "expected parse error for {:?}",
                content
            );
        }
    }

    #[test]
    fn test_private_and_invalid_section_names_cannot_be_written() {
        let private = ConfigMapping::new().with_section("_hidden", [("k", "v")]);
        assert!(PythonBackend.render(&private).is_err());

        let spaced = ConfigMapping::new().with_section("My Section", [("k", "v")]);
        assert!(PythonBackend.render(&spaced).is_err());
    }
}
