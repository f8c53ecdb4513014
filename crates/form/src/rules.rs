//! Static form rules
//!
//! One rule per (property, mapped entity) pair, generated once when a form
//! dialog is built. Array properties append every occurrence; singleton
//! properties only take an entity recognized exactly once in the turn.

use serde::{Deserialize, Serialize};
use slotfill_core::{EntityMap, FormSchema, Trigger};
use std::fmt;

use crate::{FormError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleCondition {
    /// At least one occurrence
    Present,
    /// Exactly one occurrence
    ExactlyOne,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleAction {
    Append,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormRule {
    pub property: String,
    pub entity: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

impl FormRule {
    pub fn new(property: impl Into<String>, entity: impl Into<String>, is_array: bool) -> Self {
        let (condition, action) = if is_array {
            (RuleCondition::Present, RuleAction::Append)
        } else {
            (RuleCondition::ExactlyOne, RuleAction::Set)
        };
        Self {
            property: property.into(),
            entity: entity.into(),
            condition,
            action,
        }
    }

    /// Condition in expression form, e.g. `count(@@size) == 1`
    pub fn expression(&self) -> String {
        match self.condition {
            RuleCondition::Present => format!("@@{}", self.entity),
            RuleCondition::ExactlyOne => format!("count(@@{}) == 1", self.entity),
        }
    }
}

impl fmt::Display for FormRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.action {
            RuleAction::Append => "append to",
            RuleAction::Set => "set",
        };
        write!(f, "{} => {} {}", self.expression(), verb, self.property)
    }
}

impl Trigger for FormRule {
    fn property(&self) -> &str {
        &self.property
    }

    fn entity(&self) -> &str {
        &self.entity
    }

    fn fires(&self, entities: &EntityMap) -> bool {
        let count = entities.count(&self.entity);
        match self.condition {
            RuleCondition::Present => count >= 1,
            RuleCondition::ExactlyOne => count == 1,
        }
    }
}

/// Generate the rule set for a schema
///
/// Object-typed properties are rejected: mapping into nested properties is
/// not supported.
pub fn generate_rules(schema: &FormSchema) -> Result<Vec<FormRule>> {
    let mut rules = Vec::new();

    for property in schema.properties() {
        if !property.is_leaf() {
            return Err(if property.mappings.is_empty() {
                FormError::NestedProperty(property.path.clone())
            } else {
                FormError::NonLeafMapping(property.path.clone())
            });
        }

        for entity in &property.mappings {
            rules.push(FormRule::new(&property.path, entity, property.is_array));
        }
    }

    tracing::info!(
        properties = schema.properties().len(),
        rules = rules.len(),
        "Generated form rules"
    );
    Ok(rules)
}
