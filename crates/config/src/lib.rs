//! Configuration management for slot filling
//!
//! Supports loading configuration from:
//! - YAML/TOML files (`config/default`, `config/{env}`)
//! - Environment variables (SLOTFILL_ prefix, `__` separator)
//!
//! Form schemas are loaded from JSON or YAML files and cached per dialog in a
//! `SchemaRegistry` so every conversation shares one parsed copy.

pub mod observability;
pub mod schema;
pub mod settings;

pub use observability::init_tracing;
pub use schema::{FormSchemaFile, SchemaRegistry};
pub use settings::{load_settings, load_settings_from, FormSettings, ObservabilityConfig, Settings};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid form schema: {0}")]
    Schema(#[from] slotfill_core::Error),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
