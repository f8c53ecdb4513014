//! Entity normalization
//!
//! Turns recognizer output of the shape
//!
//! ```json
//! {
//!   "city": ["Paris"],
//!   "$instance": {
//!     "city": [{ "startIndex": 18, "endIndex": 23, "text": "Paris", "role": null, "score": 0.9 }]
//!   }
//! }
//! ```
//!
//! into `EntityInfo` occurrences grouped by name. Missing metadata degrades
//! to zero-length spans instead of failing the turn; such occurrences are
//! assumed not to overlap anything.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use slotfill_config::FormSettings;
use slotfill_core::{EntityInfo, EntityMap, EntityValue, INSTANCE_KEY, RESERVED_PREFIX};

/// One turn of recognizer output
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognizerResult {
    /// Utterance text
    #[serde(default)]
    pub text: String,
    /// Entities keyed by name, with `$instance` metadata
    #[serde(default)]
    pub entities: Value,
}

impl RecognizerResult {
    pub fn new(text: impl Into<String>, entities: Value) -> Self {
        Self {
            text: text.into(),
            entities,
        }
    }
}

/// Convert recognizer output into occurrences grouped by entity name
///
/// Pure function of its inputs: the same output always yields the same map.
pub fn normalize_entities(
    utterance: &str,
    entities: &Value,
    turn: u32,
    settings: &FormSettings,
) -> EntityMap {
    let mut map = EntityMap::new();
    let Some(entities) = entities.as_object() else {
        if !entities.is_null() {
            tracing::warn!("Recognizer entities are not an object, ignoring");
        }
        return map;
    };

    let utterance_len = utterance.chars().count();
    if utterance_len == 0 && !entities.is_empty() {
        tracing::warn!("Empty utterance, entity coverage defaults to 0");
    }

    let metadata = entities.get(INSTANCE_KEY).and_then(Value::as_object);

    for (name, values) in entities {
        if name.starts_with(RESERVED_PREFIX) {
            continue;
        }

        let instances = metadata
            .and_then(|m| m.get(name))
            .and_then(Value::as_array);
        if instances.is_none() {
            tracing::warn!(entity = %name, "Missing $instance metadata, skipping overlap checks");
        }

        let values: Vec<&Value> = match values {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        };

        let mut infos = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            let instance = instances.and_then(|i| i.get(index));
            let info = build_info(name, value, instance, turn)
                .with_index(index)
                .with_metrics(utterance_len);

            if info.score < settings.min_entity_score {
                tracing::trace!(entity = %name, score = info.score, "Dropping low-score occurrence");
                continue;
            }
            infos.push(info);
        }

        if settings.prune_covered_occurrences {
            prune_covered(&mut infos);
        }

        for info in infos {
            map.insert(info);
        }
    }

    map
}

fn build_info(name: &str, value: &Value, instance: Option<&Value>, turn: u32) -> EntityInfo {
    let index = |key: &str| {
        instance
            .and_then(|i| i.get(key))
            .and_then(Value::as_u64)
            .map(|v| v as usize)
    };
    let string = |key: &str| {
        instance
            .and_then(|i| i.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let start = index("startIndex").unwrap_or(0);
    let end = index("endIndex").unwrap_or(start);

    let mut info = EntityInfo::new(name, EntityValue::from(value.clone()), start, end)
        .with_score(
            instance
                .and_then(|i| i.get("score"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        )
        .with_turn(turn);

    if let Some(text) = string("text") {
        info = info.with_text(text);
    }
    if let Some(entity_type) = string("type") {
        info = info.with_type(entity_type);
    }
    if let Some(role) = string("role") {
        info = info.with_role(role);
    }
    info
}

/// Keep only maximal occurrences: drop any occurrence whose span lies within
/// an earlier one of the same name
fn prune_covered(infos: &mut Vec<EntityInfo>) {
    infos.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<EntityInfo> = Vec::with_capacity(infos.len());
    for info in infos.drain(..) {
        if kept.iter().any(|k| k.covers(&info)) {
            tracing::trace!(entity = %info.name, start = info.start, end = info.end, "Pruned covered occurrence");
            continue;
        }
        kept.push(info);
    }
    *infos = kept;
}
