use std::fmt;

use chrono::{Local, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

/// Level label written to log files.
pub fn level_name(level: &Level) -> &'static str {
    match *level {
        Level::TRACE => "TRACE",
        Level::DEBUG => "DEBUG",
        Level::INFO => "INFO",
        Level::WARN => "WARNING",
        Level::ERROR => "ERROR",
    }
}

/// `2024-01-31 09:15:02 | INFO     | demo | demo::net:42 - message key=value`
#[derive(Debug, Clone)]
pub struct TextFormat {
    project: String,
}

impl TextFormat {
    pub fn new(project: impl Into<String>) -> Self {
        Self { project: project.into() }
    }
}

impl<S, N> FormatEvent<S, N> for TextFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        write!(
            writer,
            "{} | {:<8} | {} | {}:{} - ",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            level_name(meta.level()),
            self.project,
            meta.target(),
            meta.line().unwrap_or(0),
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// One JSON object per line.
#[derive(Debug, Clone)]
pub struct JsonLineFormat {
    project: String,
}

impl JsonLineFormat {
    pub fn new(project: impl Into<String>) -> Self {
        Self { project: project.into() }
    }

    fn payload(&self, event: &Event<'_>) -> Map<String, Value> {
        let meta = event.metadata();
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        let thread = std::thread::current();
        let thread = thread
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", thread.id()));

        let mut payload = Map::new();
        payload.insert("ts".into(), Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true).into());
        payload.insert("level".into(), level_name(meta.level()).into());
        payload.insert("logger".into(), meta.target().into());
        payload.insert("msg".into(), visitor.message.unwrap_or_default().into());
        payload.insert("pathname".into(), meta.file().into());
        payload.insert("lineno".into(), meta.line().into());
        payload.insert("func".into(), meta.module_path().into());
        payload.insert("process".into(), std::process::id().into());
        payload.insert("thread".into(), thread.into());
        payload.insert("project".into(), self.project.clone().into());

        for (key, value) in visitor.fields {
            payload.entry(key).or_insert(value);
        }
        payload
    }
}

impl<S, N> FormatEvent<S, N> for JsonLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let line =
            serde_json::to_string(&Value::Object(self.payload(event))).map_err(|_| fmt::Error)?;
        writeln!(writer, "{}", line)
    }
}

#[derive(Default)]
struct FieldCollector {
    message: Option<String>,
    fields: Map<String, Value>,
}

impl FieldCollector {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::String(format!("{:?}", value)));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::String(value.to_string()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, value.into());
    }
}
