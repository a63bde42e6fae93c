//! Process-wide logging setup
//!
//! [`LoggingConfigurator::configure`] installs a `tracing` subscriber with up
//! to three outputs, each filtered at the configured level:
//!
//! - console: compact human output on stderr
//! - `<log dir>/<project>.log`: plain text, one event per line
//! - `<log dir>/<project>.jsonl`: JSON lines (opt-in)
//!
//! Files roll over at UTC midnight into `YYYYMMDD.<file>` archives. Modules
//! registered with [`LogSettings::watch`] additionally get a file of their own
//! under `<log dir>/<module path>/`.
//!
//! `LOG_PROJECT`, `LOG_LEVEL`, `LOG_CONSOLE`, `LOG_JSON`, `LOG_RETENTION_DAYS`
//! and `LOG_DIR` override the settings given in code.

mod format;
mod rotation;

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, Dispatch};
use tracing_subscriber::filter::{LevelFilter, Targets};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::env::{EnvParser, EnvVars};
use crate::config::validation::ConfigValidator;
use crate::error::{FileSystemError, Result, UtilitiesError};
use crate::paths::{normalize_name, Paths};

pub use format::{level_name, JsonLineFormat, TextFormat};
pub use rotation::{rollover, ArchiveNaming, RollingFile};

/// Folder inside a project folder that holds its logs.
pub const LOGS_FOLDER_NAME: &str = "logs";

const DEFAULT_RETENTION_DAYS: u64 = 14;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// A module that gets its own log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleWatch {
    module: String,
    level: String,
}

impl ModuleWatch {
    /// Module path with `::` separators, as used in `tracing` targets.
    pub fn target(&self) -> String {
        self.segments().join("::")
    }

    fn segments(&self) -> Vec<&str> {
        self.module
            .split("::")
            .flat_map(|part| part.split('.'))
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// `<log dir>/a/b/<project>.a.b.log`
    pub fn file_path(&self, log_dir: &Path, project: &str) -> PathBuf {
        let segments = self.segments();
        let mut dir = log_dir.to_path_buf();
        for segment in &segments {
            dir.push(segment);
        }
        dir.join(format!("{}.{}.log", project, segments.join(".")))
    }
}

/// What [`LoggingConfigurator`] should set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub project: Option<String>,
    pub level: String,
    pub base_dir: Option<PathBuf>,
    pub console: bool,
    pub log_file: bool,
    pub json_file: bool,
    pub retention_days: u64,
    pub date_prefix_files: bool,
    watches: Vec<ModuleWatch>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            project: None,
            level: "INFO".to_string(),
            base_dir: None,
            console: true,
            log_file: true,
            json_file: false,
            retention_days: DEFAULT_RETENTION_DAYS,
            date_prefix_files: true,
            watches: Vec::new(),
        }
    }
}

impl LogSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults with file output for `project`.
    pub fn for_project(project: impl Into<String>) -> Self {
        Self::default().project(project)
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// A level name (`DEBUG`, `warning`, ...) or filter directives such as
    /// `info,my_crate::net=debug`.
    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    pub fn log_file(mut self, enabled: bool) -> Self {
        self.log_file = enabled;
        self
    }

    pub fn json_file(mut self, enabled: bool) -> Self {
        self.json_file = enabled;
        self
    }

    /// Archives kept per file; 0 keeps all of them.
    pub fn retention_days(mut self, days: u64) -> Self {
        self.retention_days = days;
        self
    }

    pub fn date_prefix_files(mut self, enabled: bool) -> Self {
        self.date_prefix_files = enabled;
        self
    }

    /// Send events of `module` (and its children) at `level` or above to a
    /// dedicated file. Accepts `a::b` or `a.b`.
    pub fn watch(mut self, module: impl Into<String>, level: impl Into<String>) -> Result<Self> {
        let module = module.into();
        ConfigValidator::validate_module_path(&module)?;
        let watch = ModuleWatch {
            module,
            level: level.into(),
        };
        if !self.watches.iter().any(|w| w.target() == watch.target()) {
            self.watches.push(watch);
        }
        Ok(self)
    }

    pub fn watches(&self) -> &[ModuleWatch] {
        &self.watches
    }

    /// Apply the `LOG_*` environment variables (and a `.env` file).
    pub fn apply_env(self) -> Result<Self> {
        dotenvy::dotenv().ok();
        self.apply_env_from(|var| env::var(var).ok())
    }

    /// Same as [`LogSettings::apply_env`] with a custom variable source.
    /// JSON output, retention and log dir only matter when a project is set.
    pub fn apply_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let project = EnvParser::clean(EnvVars::LOG_PROJECT, lookup(EnvVars::LOG_PROJECT), None)?;
        if let Some(project) = project {
            self.project = Some(project);
        }
        let level = EnvParser::clean(EnvVars::LOG_LEVEL, lookup(EnvVars::LOG_LEVEL), None)?;
        if let Some(level) = level {
            self.level = level;
        }
        let console = EnvParser::bool_value(EnvVars::LOG_CONSOLE, lookup(EnvVars::LOG_CONSOLE))?;
        if let Some(console) = console {
            self.console = console;
        }

        if self.project.is_some() {
            let json = EnvParser::bool_value(EnvVars::LOG_JSON, lookup(EnvVars::LOG_JSON))?;
            if let Some(json) = json {
                self.json_file = json;
            }
            if let Some(days) = EnvParser::u64_value(
                EnvVars::LOG_RETENTION_DAYS,
                lookup(EnvVars::LOG_RETENTION_DAYS),
                1,
                3650,
            )? {
                self.retention_days = days;
            }
            if let Some(dir) = EnvParser::clean(EnvVars::LOG_DIR, lookup(EnvVars::LOG_DIR), None)? {
                self.base_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(self)
    }

    fn naming(&self) -> ArchiveNaming {
        if self.date_prefix_files {
            ArchiveNaming::DatePrefix
        } else {
            ArchiveNaming::DateSuffix
        }
    }

    fn retention(&self) -> usize {
        usize::try_from(self.retention_days).unwrap_or(usize::MAX)
    }
}

#[derive(Debug, Clone)]
struct ActiveLogging {
    project: Option<String>,
    log_dir: Option<PathBuf>,
    console: bool,
}

static ACTIVE: Mutex<Option<ActiveLogging>> = Mutex::new(None);

fn active() -> Option<ActiveLogging> {
    ACTIVE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Entry point for setting up logging.
pub struct LoggingConfigurator;

impl LoggingConfigurator {
    /// Install the global subscriber described by `settings` after applying
    /// the environment overrides. Only the first successful call has any
    /// effect; it returns `true`, later calls return `false`.
    pub fn configure(settings: LogSettings) -> Result<bool> {
        let mut guard = ACTIVE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.is_some() {
            return Ok(false);
        }

        let settings = settings.apply_env()?;
        let (dispatch, state) = assemble(&settings)?;
        tracing::dispatcher::set_global_default(dispatch).map_err(|e| {
            UtilitiesError::Logging(format!("a global subscriber is already set: {}", e))
        })?;

        debug!(
            "Logging configured (project: {}, level: {})",
            state.project.as_deref().unwrap_or("none"),
            settings.level
        );
        *guard = Some(state);
        Ok(true)
    }

    /// Build the subscriber for `settings` as-is, without installing it or
    /// reading the environment. Use with `tracing::dispatcher::with_default`.
    pub fn build(settings: &LogSettings) -> Result<Dispatch> {
        assemble(settings).map(|(dispatch, _)| dispatch)
    }

    pub fn is_configured() -> bool {
        active().is_some()
    }

    /// Whether the installed setup writes to the console.
    pub fn console_enabled() -> bool {
        active().map(|a| a.console).unwrap_or(false)
    }

    pub fn project() -> Option<String> {
        active().and_then(|a| a.project)
    }

    /// Folder receiving the installed setup's log files.
    pub fn log_dir() -> Option<PathBuf> {
        active().and_then(|a| a.log_dir)
    }

    /// Log folder for `project`: `LOG_DIR`, else `base_dir`, else the
    /// project folder's `logs/`.
    pub fn log_dir_for(project: &str, base_dir: Option<&Path>) -> Result<PathBuf> {
        let from_env = EnvParser::parse_path(EnvVars::LOG_DIR, false)?;
        resolve_log_dir(project, from_env.as_deref().or(base_dir))
    }
}

fn resolve_log_dir(project: &str, base_dir: Option<&Path>) -> Result<PathBuf> {
    match base_dir {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(Paths::from_env()?.project_path(project)?.join(LOGS_FOLDER_NAME)),
    }
}

/// Map level words other tools use onto `tracing` directives.
fn normalize_directives(directives: &str) -> String {
    directives
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(|directive| match directive.rsplit_once('=') {
            Some((target, level)) => format!("{}={}", target, normalize_level_word(level)),
            None => normalize_level_word(directive),
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn normalize_level_word(word: &str) -> String {
    match word.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "notset" => "trace".to_string(),
        other => other.to_string(),
    }
}

/// Level for a single level name; unknown names mean `INFO`.
pub fn parse_level(level: &str) -> LevelFilter {
    normalize_level_word(level)
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO)
}

fn level_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(normalize_directives(directives))
}

fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| FileSystemError::io(path, e).into())
}

fn open_log(path: PathBuf, settings: &LogSettings) -> Result<RollingFile> {
    RollingFile::open(&path, settings.naming(), settings.retention()).map_err(|e: io::Error| {
        UtilitiesError::FileSystem(FileSystemError::io(&path, e))
    })
}

fn assemble(settings: &LogSettings) -> Result<(Dispatch, ActiveLogging)> {
    ConfigValidator::validate_range(settings.retention_days, 0, 3650, "log retention days")?;

    let mut layers: Vec<BoxedLayer> = Vec::new();

    if settings.console {
        layers.push(
            fmt::layer()
                .compact()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(level_filter(&settings.level))
                .boxed(),
        );
    }

    let project = settings.project.as_deref().map(normalize_name).transpose()?;
    let mut log_dir = None;

    if let Some(project) = &project {
        let dir = resolve_log_dir(project, settings.base_dir.as_deref())?;

        if settings.log_file {
            ensure_dir(&dir)?;
            let file = open_log(dir.join(format!("{}.log", project)), settings)?;
            layers.push(
                fmt::layer()
                    .event_format(TextFormat::new(project.as_str()))
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(level_filter(&settings.level))
                    .boxed(),
            );
        }

        if settings.json_file {
            ensure_dir(&dir)?;
            let file = open_log(dir.join(format!("{}.jsonl", project)), settings)?;
            layers.push(
                fmt::layer()
                    .event_format(JsonLineFormat::new(project.as_str()))
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(level_filter(&settings.level))
                    .boxed(),
            );
        }

        for watch in &settings.watches {
            let path = watch.file_path(&dir, project);
            if let Some(parent) = path.parent() {
                ensure_dir(parent)?;
            }
            let file = open_log(path, settings)?;
            let targets = Targets::new().with_target(watch.target(), parse_level(&watch.level));
            layers.push(
                fmt::layer()
                    .event_format(TextFormat::new(project.as_str()))
                    .with_ansi(false)
                    .with_writer(file)
                    .with_filter(targets)
                    .boxed(),
            );
        }

        log_dir = Some(dir);
    }

    let dispatch = Dispatch::new(tracing_subscriber::registry().with(layers));
    let state = ActiveLogging {
        project,
        log_dir,
        console: settings.console,
    };
    Ok((dispatch, state))
}
