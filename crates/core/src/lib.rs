//! Core types for entity-to-slot resolution
//!
//! This crate provides the foundational types shared by the other crates:
//! - Recognized entity occurrences (`EntityInfo`) and their payloads
//! - Form schema lookup (`FormSchema`, `PropertySchema`)
//! - Slot operations (`Operation`, `SlotOp`)
//! - Narrow traits at the seams (`SchemaLookup`, `TriggerSelector`)
//! - Error types

pub mod entity;
pub mod error;
pub mod operation;
pub mod schema;
pub mod traits;

pub use entity::{EntityInfo, EntityMap, EntityValue, Scalar};
pub use error::{Error, Result};
pub use operation::{Operation, SlotOp};
pub use schema::{FormSchema, PropertySchema};
pub use traits::{FiringRuleSelector, SchemaLookup, Trigger, TriggerSelector};

/// Prefix reserved for recognizer metadata keys such as `$instance`
pub const RESERVED_PREFIX: &str = "$";

/// Key holding per-occurrence span metadata in recognizer output
pub const INSTANCE_KEY: &str = "$instance";
