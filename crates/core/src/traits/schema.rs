//! Schema lookup trait

use crate::schema::{FormSchema, PropertySchema};

/// Read-only access to slot definitions
///
/// Implementations must be cheap to share across conversations; the
/// resolver never mutates them.
pub trait SchemaLookup: Send + Sync {
    /// Top-level slots in declaration order
    fn slots(&self) -> &[PropertySchema];

    /// Look a slot up by dotted path
    fn lookup(&self, path: &str) -> Option<&PropertySchema>;

    /// True when the slot only accepts entities while expected
    fn is_expected_only(&self, path: &str) -> bool;

    /// Whether a slot is array-valued; unknown slots are treated as singletons
    fn is_array(&self, path: &str) -> bool {
        self.lookup(path).map(|p| p.is_array).unwrap_or(false)
    }
}

impl SchemaLookup for FormSchema {
    fn slots(&self) -> &[PropertySchema] {
        self.properties()
    }

    fn lookup(&self, path: &str) -> Option<&PropertySchema> {
        self.path_to_schema(path)
    }

    fn is_expected_only(&self, path: &str) -> bool {
        FormSchema::is_expected_only(self, path)
    }
}
