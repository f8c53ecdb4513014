//! Recognized entity occurrences
//!
//! An `EntityInfo` is one occurrence of a recognized entity within a single
//! utterance: its payload, character span, score, role and the derived
//! `priority`/`coverage` used to order competing interpretations.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar entity payload
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Bool(bool),
    /// Kept as parsed so integers round-trip exactly
    Number(Number),
    String(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::String(s) => write!(f, "{}", s),
        }
    }
}

/// Entity payload as reported by a recognizer
///
/// An `Array` with more than one element signals value ambiguity, e.g.
/// "peppers" resolving to both "green peppers" and "red peppers".
/// Objects and nulls (composite entities, datetime resolutions) are kept
/// as `Structured`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum EntityValue {
    Scalar(Scalar),
    Array(Vec<EntityValue>),
    Structured(Value),
}

impl EntityValue {
    /// Convenience constructor for string payloads
    pub fn string(s: impl Into<String>) -> Self {
        EntityValue::Scalar(Scalar::String(s.into()))
    }

    /// Build an array payload from string choices
    pub fn choices<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EntityValue::Array(values.into_iter().map(EntityValue::string).collect())
    }

    /// True when the payload lists more than one candidate value
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, EntityValue::Array(values) if values.len() > 1)
    }

    /// Candidate values if this is an array payload
    pub fn as_array(&self) -> Option<&[EntityValue]> {
        match self {
            EntityValue::Array(values) => Some(values),
            _ => None,
        }
    }

    /// Collapse a one-element array to its element
    pub fn unwrap_single(self) -> Self {
        match self {
            EntityValue::Array(mut values) if values.len() == 1 => values.remove(0),
            other => other,
        }
    }

    /// First string found, descending into arrays
    pub fn first_str(&self) -> Option<&str> {
        match self {
            EntityValue::Scalar(Scalar::String(s)) => Some(s),
            EntityValue::Array(values) => values.first().and_then(|v| v.first_str()),
            _ => None,
        }
    }

    /// Values as a list: the elements of an array, or the value itself
    pub fn to_list(&self) -> Vec<EntityValue> {
        match self {
            EntityValue::Array(values) => values.clone(),
            other => vec![other.clone()],
        }
    }
}

impl From<Value> for EntityValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(b) => EntityValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => EntityValue::Scalar(Scalar::Number(n)),
            Value::String(s) => EntityValue::Scalar(Scalar::String(s)),
            Value::Array(items) => {
                EntityValue::Array(items.into_iter().map(EntityValue::from).collect())
            }
            other => EntityValue::Structured(other),
        }
    }
}

impl From<EntityValue> for Value {
    fn from(value: EntityValue) -> Self {
        match value {
            EntityValue::Scalar(Scalar::Bool(b)) => Value::Bool(b),
            EntityValue::Scalar(Scalar::Number(n)) => Value::Number(n),
            EntityValue::Scalar(Scalar::String(s)) => Value::String(s),
            EntityValue::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            EntityValue::Structured(v) => v,
        }
    }
}

impl From<&str> for EntityValue {
    fn from(s: &str) -> Self {
        EntityValue::string(s)
    }
}

impl fmt::Display for EntityValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityValue::Scalar(s) => write!(f, "{}", s),
            EntityValue::Array(values) => {
                let parts: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            EntityValue::Structured(v) => write!(f, "{}", v),
        }
    }
}

/// One recognized entity occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    /// Entity name as reported by the recognizer
    pub name: String,
    /// Recognizer payload
    pub value: EntityValue,
    /// Start character offset
    pub start: usize,
    /// End character offset (exclusive)
    pub end: usize,
    /// Recognizer score in [0, 1]
    #[serde(default)]
    pub score: f64,
    /// Surface text
    #[serde(default)]
    pub text: String,
    /// Role qualifying the entity, e.g. `origin` on a `city`
    #[serde(default)]
    pub role: Option<String>,
    /// Recognizer entity type
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    /// Lower is preferred; 0 when a role is present, else 1
    #[serde(default)]
    pub priority: i32,
    /// Fraction of the utterance covered by the span
    #[serde(default)]
    pub coverage: f64,
    /// Turn the occurrence was recognized in
    #[serde(default)]
    pub turn: u32,
    /// Position among the recognizer's occurrences of this name
    #[serde(default)]
    pub index: usize,
}

impl EntityInfo {
    /// Create an occurrence without role, score or metrics
    pub fn new(name: impl Into<String>, value: impl Into<EntityValue>, start: usize, end: usize) -> Self {
        let end = end.max(start);
        Self {
            name: name.into(),
            value: value.into(),
            start,
            end,
            score: 0.0,
            text: String::new(),
            role: None,
            entity_type: None,
            priority: 1,
            coverage: 0.0,
            turn: 0,
            index: 0,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        let role = role.into();
        self.role = if role.is_empty() { None } else { Some(role) };
        self.priority = if self.role.is_some() { 0 } else { 1 };
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Compute `priority` and `coverage` against the utterance length
    ///
    /// An empty utterance yields a coverage of 0.
    pub fn with_metrics(mut self, utterance_len: usize) -> Self {
        self.priority = if self.role.is_some() { 0 } else { 1 };
        self.coverage = if utterance_len > 0 {
            self.span_len() as f64 / utterance_len as f64
        } else {
            0.0
        };
        self
    }

    /// Length of the span in characters
    pub fn span_len(&self) -> usize {
        self.end - self.start
    }

    /// False for the zero-length spans given to occurrences without
    /// position metadata
    pub fn is_located(&self) -> bool {
        self.end > self.start
    }

    /// Closed-interval overlap, symmetric
    ///
    /// Unlocated occurrences overlap nothing.
    pub fn overlaps(&self, other: &EntityInfo) -> bool {
        self.is_located()
            && other.is_located()
            && self.start <= other.end
            && self.end >= other.start
    }

    /// True when `other`'s span lies within this one
    pub fn covers(&self, other: &EntityInfo) -> bool {
        self.is_located()
            && other.is_located()
            && self.start <= other.start
            && self.end >= other.end
    }

    /// Identity of the occurrence within a turn's entity map
    pub fn same_occurrence(&self, other: &EntityInfo) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.start == other.start
            && self.end == other.end
            && self.turn == other.turn
    }
}

/// Entity occurrences grouped by name, iterated in name order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityMap {
    entries: BTreeMap<String, Vec<EntityInfo>>,
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an occurrence under its name
    pub fn insert(&mut self, info: EntityInfo) {
        self.entries.entry(info.name.clone()).or_default().push(info);
    }

    /// Occurrences recognized for a name
    pub fn get(&self, name: &str) -> &[EntityInfo] {
        self.entries.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Number of occurrences recognized for a name
    pub fn count(&self, name: &str) -> usize {
        self.get(name).len()
    }

    /// Remove and return every occurrence of a name
    pub fn take(&mut self, name: &str) -> Vec<EntityInfo> {
        self.entries.remove(name).unwrap_or_default()
    }

    pub fn contains(&self, info: &EntityInfo) -> bool {
        self.get(&info.name).iter().any(|e| e.same_occurrence(info))
    }

    /// Remove every occurrence overlapping `info`, including `info` itself
    pub fn remove_overlapping(&mut self, info: &EntityInfo) -> Vec<EntityInfo> {
        let mut removed = Vec::new();
        for infos in self.entries.values_mut() {
            let (gone, kept): (Vec<_>, Vec<_>) = infos
                .drain(..)
                .partition(|e| e.same_occurrence(info) || e.overlaps(info));
            *infos = kept;
            removed.extend(gone);
        }
        self.entries.retain(|_, infos| !infos.is_empty());
        removed
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// All occurrences in name order, then recognizer order
    pub fn iter(&self) -> impl Iterator<Item = &EntityInfo> {
        self.entries.values().flatten()
    }

    /// Total number of occurrences
    pub fn len(&self) -> usize {
        self.entries.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<EntityInfo> for EntityMap {
    fn from_iter<T: IntoIterator<Item = EntityInfo>>(iter: T) -> Self {
        let mut map = EntityMap::new();
        for info in iter {
            map.insert(info);
        }
        map
    }
}
