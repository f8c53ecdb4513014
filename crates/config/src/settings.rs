//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Entity resolution behaviour
    #[serde(default)]
    pub form: FormSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Default form schema file (JSON or YAML)
    #[serde(default)]
    pub schema_path: Option<String>,
}

/// Entity resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSettings {
    /// Name of the pseudo-entity spanning the whole utterance
    #[serde(default = "default_utterance_entity")]
    pub utterance_entity: String,

    /// Entity naming a property when answering a property choice
    #[serde(default = "default_property_entity")]
    pub property_entity: String,

    /// Drop older pending operations on a singleton slot when a newer turn
    /// produced one
    #[serde(default = "default_true")]
    pub merge_previous_turns: bool,

    /// Keep only maximal occurrences per entity name
    #[serde(default = "default_true")]
    pub prune_covered_occurrences: bool,

    /// Occurrences scoring below this are discarded
    #[serde(default)]
    pub min_entity_score: f64,
}

fn default_utterance_entity() -> String {
    "utterance".to_string()
}

fn default_property_entity() -> String {
    "PROPERTYName".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for FormSettings {
    fn default() -> Self {
        Self {
            utterance_entity: default_utterance_entity(),
            property_entity: default_property_entity(),
            merge_previous_turns: true,
            prune_covered_occurrences: true,
            min_entity_score: 0.0,
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_form()?;
        self.validate_observability()?;
        Ok(())
    }

    fn validate_form(&self) -> Result<(), ConfigError> {
        let form = &self.form;

        if !(0.0..=1.0).contains(&form.min_entity_score) {
            return Err(ConfigError::InvalidValue {
                field: "form.min_entity_score".to_string(),
                message: format!("Must be between 0.0 and 1.0, got {}", form.min_entity_score),
            });
        }

        if form.utterance_entity.is_empty() || form.utterance_entity.starts_with('$') {
            return Err(ConfigError::InvalidValue {
                field: "form.utterance_entity".to_string(),
                message: "Must be a non-empty name without the '$' prefix".to_string(),
            });
        }

        if form.property_entity.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "form.property_entity".to_string(),
                message: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }

    fn validate_observability(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        let level = self.observability.log_level.to_lowercase();
        if !LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_level".to_string(),
                message: format!("Unknown level '{}'", self.observability.log_level),
            });
        }
        Ok(())
    }
}

/// Load settings from files and environment
///
/// Priority: env vars > config/{env} > config/default > defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings rooted at a custom config directory
pub fn load_settings_from(dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(&format!("{}/default", dir)).required(false));

    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", dir, env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("SLOTFILL")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    settings.validate()?;

    Ok(settings)
}
