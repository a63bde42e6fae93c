//! Per-project configuration files
//!
//! A project's settings live in `<root>/<project>/config.<ext>` as sections of
//! key/value pairs. [`ConfigStore`] finds or creates that file, keeps the
//! parsed [`ConfigMapping`] cached per project and writes every change back
//! immediately. INI is the default format; JSON, TOML and Python-module files
//! are read and written through the same [`FormatBackend`](backends::FormatBackend)
//! interface.

pub mod backends;
pub mod builder;
pub mod env;
mod format;
pub(crate) mod mapping;
mod project;
mod store;
pub mod validation;

pub use builder::StoreBuilder;
pub use format::ConfigFormat;
pub use mapping::{ConfigMapping, ConfigValue, Section};
pub use project::ProjectConfig;
pub use store::ConfigStore;
