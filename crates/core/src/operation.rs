//! Slot operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation applied to a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Set a singleton slot, or append to an array slot
    #[default]
    Add,
    /// Remove a value from the slot
    Remove,
    /// Unset the slot
    Clear,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
            Operation::Clear => "clear",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slot path paired with the operation to apply to it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotOp {
    pub slot: String,
    #[serde(default)]
    pub operation: Operation,
}

impl SlotOp {
    pub fn new(slot: impl Into<String>, operation: Operation) -> Self {
        Self {
            slot: slot.into(),
            operation,
        }
    }

    /// `add` operation on a slot
    pub fn add(slot: impl Into<String>) -> Self {
        Self::new(slot, Operation::Add)
    }
}

impl fmt::Display for SlotOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.slot)
    }
}
