//! Parsing and validation of `strata.toml` project configuration files.
//!
//! The configuration describes the project's modules and their dependency
//! edges, the analysis settings shared by every resolution session, and which
//! checks are denied or allowed.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
