//! Helpers shared by every project using this crate
//!
//! - `logging`: subscriber setup with console, text/JSON files and rotation
//! - `progress`: spinner shown around blocking calls

pub mod logging;
pub mod progress;
