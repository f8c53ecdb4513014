//! Form schema lookup
//!
//! A form schema is a JSON-Schema subset describing the properties (slots) a
//! form dialog fills. Each property carries the entity names it accepts in
//! `$entities`; leaves without one accept the entity named like the property.
//!
//! ```json
//! {
//!   "type": "object",
//!   "properties": {
//!     "destination": { "type": "string", "$entities": ["city"] },
//!     "toppings": { "type": "array", "items": { "type": "string" }, "$entities": ["topping"] }
//!   },
//!   "required": ["destination"],
//!   "$expectedOnly": ["toppings"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

const ENTITIES_KEY: &str = "$entities";
const EXPECTED_ONLY_KEY: &str = "$expectedOnly";

/// One property (slot) of a form schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySchema {
    /// Dotted path from the schema root
    pub path: String,
    /// Last path segment
    pub name: String,
    /// JSON-Schema type name
    #[serde(rename = "type")]
    pub property_type: String,
    /// Array-valued properties accept any number of values
    pub is_array: bool,
    /// Entity names this property accepts, in preference order
    #[serde(default)]
    pub mappings: Vec<String>,
    /// Nested properties of an object-typed property
    #[serde(default)]
    pub children: Vec<PropertySchema>,
}

impl PropertySchema {
    /// Singleton leaf property
    pub fn singleton<I, S>(path: impl Into<String>, mappings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let path = path.into();
        Self {
            name: last_segment(&path).to_string(),
            path,
            property_type: "string".to_string(),
            is_array: false,
            mappings: mappings.into_iter().map(Into::into).collect(),
            children: Vec::new(),
        }
    }

    /// Array-valued leaf property
    pub fn array<I, S>(path: impl Into<String>, mappings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut schema = Self::singleton(path, mappings);
        schema.property_type = "array".to_string();
        schema.is_array = true;
        schema
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True when this property accepts entities with the given name
    pub fn maps(&self, entity_name: &str) -> bool {
        self.mappings.iter().any(|m| m == entity_name)
    }

    fn find(&self, path: &str) -> Option<&PropertySchema> {
        if self.path == path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(path))
    }
}

/// A parsed form schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    properties: Vec<PropertySchema>,
    required: Vec<String>,
    #[serde(default)]
    expected_only: Vec<String>,
}

impl FormSchema {
    /// Build a schema from properties; every property is required
    pub fn new(properties: Vec<PropertySchema>) -> Self {
        let required = properties.iter().map(|p| p.path.clone()).collect();
        Self {
            properties,
            required,
            expected_only: Vec::new(),
        }
    }

    pub fn with_required(mut self, required: Vec<String>) -> Self {
        self.required = required;
        self
    }

    pub fn with_expected_only(mut self, expected_only: Vec<String>) -> Self {
        self.expected_only = expected_only;
        self
    }

    /// Parse a JSON-Schema document
    ///
    /// Fails when the root is not an object type, when an object property
    /// declares `$entities`, or when the document is otherwise malformed.
    pub fn from_json(document: &Value) -> Result<Self> {
        let root_type = document.get("type").and_then(Value::as_str);
        if root_type != Some("object") {
            return Err(Error::RootNotObject(
                root_type.unwrap_or("<missing>").to_string(),
            ));
        }

        let properties = parse_children(document, "")?;

        let required = match document.get("required") {
            Some(value) => string_list(value, "required")?,
            None => properties.iter().map(|p| p.path.clone()).collect(),
        };
        for path in &required {
            if !properties.iter().any(|p| p.find(path).is_some()) {
                return Err(Error::InvalidSchema {
                    path: path.clone(),
                    message: "required property is not declared".to_string(),
                });
            }
        }

        let expected_only = match document.get(EXPECTED_ONLY_KEY) {
            Some(value) => string_list(value, EXPECTED_ONLY_KEY)?,
            None => Vec::new(),
        };

        tracing::debug!(
            properties = properties.len(),
            required = required.len(),
            expected_only = expected_only.len(),
            "Parsed form schema"
        );

        Ok(Self {
            properties,
            required,
            expected_only,
        })
    }

    /// Top-level properties in declaration order
    pub fn properties(&self) -> &[PropertySchema] {
        &self.properties
    }

    /// Look a property up by dotted path
    pub fn path_to_schema(&self, path: &str) -> Option<&PropertySchema> {
        self.properties.iter().find_map(|p| p.find(path))
    }

    /// Required property paths
    pub fn required(&self) -> &[String] {
        &self.required
    }

    pub fn is_expected_only(&self, path: &str) -> bool {
        self.expected_only.iter().any(|p| p == path)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn string_list(value: &Value, path: &str) -> Result<Vec<String>> {
    let items = value.as_array().ok_or_else(|| Error::InvalidSchema {
        path: path.to_string(),
        message: "expected an array of strings".to_string(),
    })?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| Error::InvalidSchema {
                path: path.to_string(),
                message: format!("expected a string, found {}", item),
            })
        })
        .collect()
}

fn parse_children(node: &Value, parent: &str) -> Result<Vec<PropertySchema>> {
    let Some(properties) = node.get("properties") else {
        return Ok(Vec::new());
    };
    let properties = properties.as_object().ok_or_else(|| Error::InvalidSchema {
        path: join_path(parent, "properties"),
        message: "expected an object".to_string(),
    })?;

    properties
        .iter()
        .map(|(name, child)| parse_property(name, &join_path(parent, name), child))
        .collect()
}

fn parse_property(name: &str, path: &str, node: &Value) -> Result<PropertySchema> {
    if !node.is_object() {
        return Err(Error::InvalidSchema {
            path: path.to_string(),
            message: "property definition must be an object".to_string(),
        });
    }

    let property_type = match node.get("type").and_then(Value::as_str) {
        Some(t) => t.to_string(),
        None if node.get("properties").is_some() => "object".to_string(),
        None if node.get("items").is_some() => "array".to_string(),
        None => "string".to_string(),
    };
    let is_array = property_type == "array";

    if is_array {
        if let Some(items) = node.get("items") {
            if items.get("properties").is_some() {
                return Err(Error::InvalidSchema {
                    path: path.to_string(),
                    message: "arrays of objects are not supported".to_string(),
                });
            }
        }
    }

    let children = if property_type == "object" {
        parse_children(node, path)?
    } else {
        Vec::new()
    };

    let explicit = match node.get(ENTITIES_KEY) {
        Some(value) => Some(string_list(value, &join_path(path, ENTITIES_KEY))?),
        None => None,
    };

    let mappings = match explicit {
        Some(_) if property_type == "object" => {
            return Err(Error::NonLeafMapping(path.to_string()));
        }
        Some(mappings) => mappings,
        None if property_type == "object" => Vec::new(),
        None => vec![name.to_string()],
    };

    Ok(PropertySchema {
        path: path.to_string(),
        name: name.to_string(),
        property_type,
        is_array,
        mappings,
        children,
    })
}
