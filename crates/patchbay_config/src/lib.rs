//! Parsing and validation of `patchbay.toml` router configuration files.
//!
//! This crate reads the project configuration and produces a strongly-typed
//! [`RouterConfig`] naming the fabric description files, the search
//! parameters of the retry loop, and the ledger output paths.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
