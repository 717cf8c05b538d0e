//! Parsing and validation of `kiln.toml` driver configuration files.
//!
//! This crate reads the configuration file and produces a strongly-typed
//! [`DriverConfig`], then resolves its relative paths against the project
//! directory into a [`ResolvedConfig`] the driver consumes.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_paths, ResolvedConfig, ResolvedModule};
pub use types::*;
