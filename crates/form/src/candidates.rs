//! Candidate entity-to-property assignments

use serde::{Deserialize, Serialize};
use slotfill_core::{EntityInfo, EntityMap, Operation, SchemaLookup, SlotOp};

/// A proposed assignment of an entity occurrence to a property
///
/// Candidates become queue entries once the resolver accepts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityToProperty {
    pub entity: EntityInfo,
    /// Target property path
    pub property: String,
    #[serde(default)]
    pub operation: Operation,
    /// The property was being prompted for when the entity arrived
    #[serde(default)]
    pub expected: bool,
}

impl EntityToProperty {
    pub fn new(entity: EntityInfo, property: impl Into<String>, expected: bool) -> Self {
        Self {
            entity,
            property: property.into(),
            operation: Operation::Add,
            expected,
        }
    }

    pub fn with_operation(mut self, operation: Operation) -> Self {
        self.operation = operation;
        self
    }

    pub fn slot_op(&self) -> SlotOp {
        SlotOp::new(self.property.clone(), self.operation)
    }
}

/// One candidate per (slot, entity) pair where the slot maps the entity name
///
/// Slots are visited in schema declaration order and mappings in their
/// listed order. Slots marked expected-only are skipped unless expected.
pub fn generate_candidates(
    entities: &EntityMap,
    schema: &dyn SchemaLookup,
    expected: &[String],
) -> Vec<EntityToProperty> {
    let mut candidates = Vec::new();

    for slot in schema.slots() {
        let is_expected = expected.iter().any(|p| p == &slot.path);
        if !is_expected && schema.is_expected_only(&slot.path) {
            continue;
        }

        for entity_name in &slot.mappings {
            for entity in entities.get(entity_name) {
                candidates.push(EntityToProperty::new(entity.clone(), &slot.path, is_expected));
            }
        }
    }

    tracing::trace!(
        entities = entities.len(),
        candidates = candidates.len(),
        "Generated candidates"
    );
    candidates
}
