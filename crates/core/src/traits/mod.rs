//! Traits at the seams of the resolution pipeline
//!
//! - `SchemaLookup`: read-only slot schema access used by the resolver
//! - `Trigger` / `TriggerSelector`: the narrow interface through which
//!   declarative rules are narrowed to candidates each turn

mod schema;
mod selector;

pub use schema::SchemaLookup;
pub use selector::{FiringRuleSelector, Trigger, TriggerSelector};
