//! Per-project configuration files, logging setup and a console spinner.
//!
//! ```no_run
//! use serde_json::json;
//! use utilities::{ConfigMapping, ConfigStore, LogSettings, LoggingConfigurator};
//!
//! # fn main() -> utilities::Result<()> {
//! LoggingConfigurator::configure(LogSettings::for_project("demo"))?;
//!
//! let mut store = ConfigStore::from_env()?;
//! let schema = ConfigMapping::from_json(json!({"Net": {"Port": "8080"}}))?;
//! store.ensure_initialized("demo", schema)?;
//!
//! let port: u16 = store.get_or_load("demo")?.get_as("Net", "Port")?;
//! store.set("demo", "Net", "Port", (port + 1).to_string())?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod paths;
pub mod utils;

pub use config::{
    ConfigFormat, ConfigMapping, ConfigStore, ConfigValue, ProjectConfig, StoreBuilder,
};
pub use error::{ConfigError, FileSystemError, Result, UtilitiesError};
pub use paths::{base_directory, project_folder, Paths};
pub use utils::logging::{LogSettings, LoggingConfigurator};
pub use utils::progress::{with_spinner, with_spinner_style, Spinner, SpinnerStyle};
