//! Persisted form state
//!
//! Holds everything that must survive between turns: pending queues, the
//! last emitted event, committed property values and a change history.
//! Hosts serialize it with the rest of their conversation state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slotfill_core::{EntityValue, FormSchema, Operation};
use std::collections::BTreeMap;
use std::fmt;

use crate::candidates::EntityToProperty;
use crate::queues::EventQueues;

/// Committed value of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Many(Vec<EntityValue>),
    Single(EntityValue),
}

impl fmt::Display for SlotValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotValue::Single(value) => write!(f, "{}", value),
            SlotValue::Many(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// Record of a committed property change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChange {
    pub timestamp: DateTime<Utc>,
    pub property: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub operation: Operation,
    /// Turn the change was committed in
    pub turn: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormState {
    #[serde(default)]
    pub queues: EventQueues,
    /// Event emitted by the previous `next_event` call
    #[serde(default)]
    pub last_event: Option<String>,
    #[serde(default)]
    pub turn: u32,
    #[serde(default)]
    values: BTreeMap<String, SlotValue>,
    #[serde(default)]
    required: Vec<String>,
    #[serde(default)]
    history: Vec<StateChange>,
}

impl FormState {
    pub fn new(schema: &FormSchema) -> Self {
        Self {
            required: schema.required().to_vec(),
            ..Default::default()
        }
    }

    pub fn get(&self, property: &str) -> Option<&SlotValue> {
        self.values.get(property)
    }

    pub fn values(&self) -> &BTreeMap<String, SlotValue> {
        &self.values
    }

    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Commit an accepted assignment
    ///
    /// `add` sets a singleton or appends to an array, `remove` drops an
    /// equal value, `clear` unsets the property.
    pub fn apply_set(&mut self, mapping: &EntityToProperty, is_array: bool) {
        let property = mapping.property.as_str();
        let value = mapping.entity.value.clone();
        let old = self.values.get(property).cloned();

        let new = match (mapping.operation, is_array) {
            (Operation::Clear, _) => None,
            (Operation::Add, false) => Some(SlotValue::Single(value)),
            (Operation::Add, true) => {
                let mut values = match &old {
                    Some(SlotValue::Many(values)) => values.clone(),
                    Some(SlotValue::Single(v)) => vec![v.clone()],
                    None => Vec::new(),
                };
                values.push(value);
                Some(SlotValue::Many(values))
            }
            (Operation::Remove, false) => match &old {
                Some(SlotValue::Single(v)) if *v == value => None,
                other => other.clone(),
            },
            (Operation::Remove, true) => match &old {
                Some(SlotValue::Many(values)) => {
                    Some(SlotValue::Many(values.iter().filter(|v| **v != value).cloned().collect()))
                }
                other => other.clone(),
            },
        };

        self.commit(property, old, new, mapping.operation);
    }

    /// Unset a property
    pub fn clear_property(&mut self, property: &str) {
        let old = self.values.get(property).cloned();
        self.commit(property, old, None, Operation::Clear);
    }

    /// Required properties without a value, in schema order
    pub fn missing_required(&self) -> Vec<&str> {
        self.required
            .iter()
            .filter(|p| match self.values.get(p.as_str()) {
                None => true,
                Some(SlotValue::Many(values)) => values.is_empty(),
                Some(SlotValue::Single(_)) => false,
            })
            .map(String::as_str)
            .collect()
    }

    /// Next property to prompt for
    pub fn next_missing(&self) -> Option<&str> {
        self.missing_required().into_iter().next()
    }

    fn commit(
        &mut self,
        property: &str,
        old: Option<SlotValue>,
        new: Option<SlotValue>,
        operation: Operation,
    ) {
        if old == new {
            return;
        }

        let old_value = old.map(|v| v.to_string());
        let new_value = new.as_ref().map(|v| v.to_string());

        match new {
            Some(value) => {
                self.values.insert(property.to_string(), value);
            }
            None => {
                self.values.remove(property);
            }
        }

        tracing::debug!(
            property = property,
            old_value = ?old_value,
            new_value = ?new_value,
            operation = %operation,
            turn = self.turn,
            "Property updated"
        );

        self.history.push(StateChange {
            timestamp: Utc::now(),
            property: property.to_string(),
            old_value,
            new_value,
            operation,
            turn: self.turn,
        });
    }
}
