//! Form schema files and the shared schema registry

use parking_lot::RwLock;
use serde_json::Value;
use slotfill_core::FormSchema;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::ConfigError;

/// Loader for form schema documents
///
/// JSON and YAML are both read through the YAML parser; `.toml` files go
/// through the TOML parser. Property declaration order is preserved.
pub struct FormSchemaFile;

impl FormSchemaFile {
    /// Load and parse a schema file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<FormSchema, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileNotFound(format!("{}: {}", path.display(), e))
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let document = if is_toml {
            Self::parse_toml(&content)?
        } else {
            Self::parse_str(&content)?
        };

        let schema = FormSchema::from_json(&document)?;
        tracing::info!(
            path = %path.display(),
            properties = schema.properties().len(),
            "Loaded form schema"
        );
        Ok(schema)
    }

    /// Parse a JSON or YAML document
    pub fn parse_str(content: &str) -> Result<Value, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn parse_toml(content: &str) -> Result<Value, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Parsed schemas keyed by dialog id
///
/// Schemas are immutable once loaded and handed out as `Arc`s, so any number
/// of concurrent conversations can read the same copy.
#[derive(Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Arc<FormSchema>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parsed schema, replacing any previous one
    pub fn insert(&self, dialog_id: impl Into<String>, schema: FormSchema) -> Arc<FormSchema> {
        let schema = Arc::new(schema);
        self.schemas.write().insert(dialog_id.into(), schema.clone());
        schema
    }

    pub fn get(&self, dialog_id: &str) -> Option<Arc<FormSchema>> {
        self.schemas.read().get(dialog_id).cloned()
    }

    /// Return the cached schema or load it from `path`
    pub fn get_or_load<P: AsRef<Path>>(
        &self,
        dialog_id: &str,
        path: P,
    ) -> Result<Arc<FormSchema>, ConfigError> {
        if let Some(schema) = self.get(dialog_id) {
            return Ok(schema);
        }

        let loaded = FormSchemaFile::load(path)?;
        let mut schemas = self.schemas.write();
        // Another caller may have loaded it meanwhile; keep the first copy
        let schema = schemas
            .entry(dialog_id.to_string())
            .or_insert_with(|| Arc::new(loaded))
            .clone();
        Ok(schema)
    }

    pub fn remove(&self, dialog_id: &str) -> Option<Arc<FormSchema>> {
        self.schemas.write().remove(dialog_id)
    }

    pub fn len(&self) -> usize {
        self.schemas.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.read().is_empty()
    }
}
