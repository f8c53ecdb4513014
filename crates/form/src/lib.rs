//! Form filling from recognized entities
//!
//! Per turn the pipeline is:
//!
//! ```text
//! recognizer output ──► normalize ──► candidates ──► resolve ──► EventQueues
//!                                                                   │
//!                            FormDialog::next_event ◄───────────────┘
//! ```
//!
//! - `normalize`: flat `$instance`-annotated recognizer output to `EntityInfo`s
//! - `candidates`: cross product of entities and schema slot mappings
//! - `resolver`: overlap pruning and classification into queues
//! - `queues`: pending set/clarify/choose/clear work, persisted across turns
//! - `rules`: static per-property rules generated from the schema
//! - `selector`: narrows firing rules to the resolver's assignments
//! - `dialog`: turn processing and queue draining
//! - `state`: committed slot values and change history

pub mod candidates;
pub mod dialog;
pub mod normalize;
pub mod queues;
pub mod resolver;
pub mod rules;
pub mod selector;
pub mod state;

pub use candidates::{generate_candidates, EntityToProperty};
pub use dialog::{FormDialog, TurnOutcome};
pub use normalize::{normalize_entities, RecognizerResult};
pub use queues::{events, EventQueues, FormEvent, SingletonChoice, SlotChoice};
pub use resolver::{resolve, Resolution};
pub use rules::{generate_rules, FormRule, RuleAction, RuleCondition};
pub use selector::SlotMapSelector;
pub use state::{FormState, SlotValue, StateChange};

use thiserror::Error;

/// Form construction errors
///
/// Raised while building a `FormDialog`, never while processing a turn.
#[derive(Error, Debug)]
pub enum FormError {
    #[error("Nested property '{0}' is not supported by form rules")]
    NestedProperty(String),

    #[error("Property '{0}' has children and cannot map entities directly")]
    NonLeafMapping(String),

    #[error("Schema error: {0}")]
    Schema(#[from] slotfill_core::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] slotfill_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, FormError>;
