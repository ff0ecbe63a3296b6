//! # Configuration
//!
//! Layered client settings: built-in defaults, then an optional JSON file
//! (`valorant.conf` or `--config-path`), then environment variables and
//! command-line flags.

/// The `ClientConfig` struct and its loaders.
pub mod client_config;

pub use client_config::{ClientConfig, ConfigError, DEFAULT_CONFIG_FILE};
