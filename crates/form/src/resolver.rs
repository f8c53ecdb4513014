//! Disambiguation resolver
//!
//! Picks one interpretation per utterance span and sorts the surviving
//! entity-to-property candidates into queues:
//!
//! 1. Occurrences are ordered role-qualified first, then by coverage. Each
//!    one still present in the working map removes every occurrence
//!    overlapping it.
//! 2. A surviving occurrence claimed by one property is queued to set (or
//!    clarify, if its value lists several choices); one claimed by several
//!    properties becomes a property choice. Expected properties win.
//! 3. Whatever is left in the working map matched nothing and is unknown.
//! 4. Singleton properties that received several values are resolved by
//!    `EventQueues::analyze`.

use slotfill_core::{EntityInfo, EntityMap, SchemaLookup};
use std::cmp::Ordering;

use crate::candidates::EntityToProperty;
use crate::queues::{EventQueues, SlotChoice};

/// Result of resolving one turn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub queues: EventQueues,
    /// Occurrences that were assigned somewhere, ordered by start
    pub recognized: Vec<EntityInfo>,
}

/// Resolve candidates against the working entity map
///
/// `entities` is consumed as resolution proceeds: on return it holds only
/// the occurrences that matched no property.
pub fn resolve(
    candidates: Vec<EntityToProperty>,
    entities: &mut EntityMap,
    schema: &dyn SchemaLookup,
) -> Resolution {
    let mut queues = EventQueues::new();
    let mut recognized = Vec::new();

    for (entity, group) in order_groups(group_by_occurrence(candidates)) {
        if !entities.contains(&entity) {
            tracing::trace!(
                entity = %entity.name,
                start = entity.start,
                end = entity.end,
                "Skipping occurrence pruned by an overlapping interpretation"
            );
            continue;
        }

        for removed in entities.remove_overlapping(&entity) {
            if !removed.same_occurrence(&entity) {
                tracing::trace!(
                    kept = %entity.name,
                    pruned = %removed.name,
                    start = removed.start,
                    end = removed.end,
                    "Pruned overlapping occurrence"
                );
            }
        }

        let preferred: Vec<EntityToProperty> = if group.iter().any(|c| c.expected) {
            group.into_iter().filter(|c| c.expected).collect()
        } else {
            group
        };

        let mut mappings: Vec<EntityToProperty> = Vec::with_capacity(preferred.len());
        for candidate in preferred {
            if !mappings.iter().any(|m| m.property == candidate.property) {
                mappings.push(candidate);
            }
        }

        if mappings.len() == 1 {
            let mapping = mappings.remove(0);
            tracing::debug!(
                entity = %entity.name,
                property = %mapping.property,
                expected = mapping.expected,
                "Entity claimed by one property"
            );
            queues.add_mapping(mapping);
        } else {
            tracing::debug!(
                entity = %entity.name,
                properties = mappings.len(),
                "Entity claimed by several properties"
            );
            queues.choose_property.push(SlotChoice {
                entity: entity.clone(),
                slots: mappings.iter().map(EntityToProperty::slot_op).collect(),
            });
        }

        recognized.push(entity);
    }

    queues.unknown = entities.iter().cloned().collect();
    if !queues.unknown.is_empty() {
        tracing::debug!(count = queues.unknown.len(), "Unmatched entities");
    }

    queues.analyze(schema);

    recognized.sort_by_key(|e| e.start);
    Resolution { queues, recognized }
}

/// Candidates grouped per occurrence, in order of first appearance
fn group_by_occurrence(
    candidates: Vec<EntityToProperty>,
) -> Vec<(EntityInfo, Vec<EntityToProperty>)> {
    let mut groups: Vec<(EntityInfo, Vec<EntityToProperty>)> = Vec::new();
    for candidate in candidates {
        match groups
            .iter_mut()
            .find(|(entity, _)| entity.same_occurrence(&candidate.entity))
        {
            Some((_, group)) => group.push(candidate),
            None => groups.push((candidate.entity.clone(), vec![candidate])),
        }
    }
    groups
}

/// Role-qualified first, then longer coverage; stable otherwise
fn order_groups(
    mut groups: Vec<(EntityInfo, Vec<EntityToProperty>)>,
) -> Vec<(EntityInfo, Vec<EntityToProperty>)> {
    groups.sort_by(|(a, _), (b, _)| compare_precedence(a, b));
    groups
}

fn compare_precedence(a: &EntityInfo, b: &EntityInfo) -> Ordering {
    a.priority
        .cmp(&b.priority)
        .then_with(|| b.coverage.total_cmp(&a.coverage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::generate_candidates;
    use slotfill_core::{EntityValue, FormSchema, PropertySchema, SlotOp};

    const UTTERANCE: &str = "book a flight to Paris";

    fn run(schema: &FormSchema, infos: Vec<EntityInfo>, expected: &[String]) -> Resolution {
        let mut entities: EntityMap = infos.into_iter().collect();
        let candidates = generate_candidates(&entities, schema, expected);
        resolve(candidates, &mut entities, schema)
    }

    fn paris(value: EntityValue) -> EntityInfo {
        EntityInfo::new("destination", value, 18, 23)
            .with_score(0.9)
            .with_metrics(UTTERANCE.len())
    }

    fn flight_schema() -> FormSchema {
        FormSchema::new(vec![PropertySchema::singleton(
            "flight.destination",
            ["destination"],
        )])
    }

    fn assert_no_overlaps(resolution: &Resolution) {
        let queues = &resolution.queues;
        let chosen: Vec<&EntityInfo> = queues
            .set_property
            .iter()
            .chain(queues.clarify_entity.iter())
            .map(|m| &m.entity)
            .chain(queues.choose_property.iter().map(|c| &c.entity))
            .chain(queues.choose_entity.iter().flat_map(|c| c.entities.iter()))
            .collect();

        for (i, a) in chosen.iter().enumerate() {
            for b in &chosen[i + 1..] {
                assert!(!a.overlaps(b), "{} overlaps {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_single_slot_goes_to_set() {
        let resolution = run(&flight_schema(), vec![paris("Paris".into())], &[]);
        let queues = &resolution.queues;

        assert_eq!(queues.set_property.len(), 1);
        assert_eq!(queues.set_property[0].property, "flight.destination");
        assert_eq!(queues.set_property[0].entity.value, EntityValue::string("Paris"));
        assert!(queues.clarify_entity.is_empty());
        assert!(queues.choose_property.is_empty());
        assert!(queues.unknown.is_empty());
        assert_eq!(resolution.recognized.len(), 1);
    }

    #[test]
    fn test_array_value_goes_to_clarify() {
        let value = EntityValue::choices(["Paris", "Paris, Texas"]);
        let resolution = run(&flight_schema(), vec![paris(value)], &[]);
        let queues = &resolution.queues;

        assert!(queues.set_property.is_empty());
        assert_eq!(queues.clarify_entity.len(), 1);
        assert_eq!(queues.clarify_entity[0].property, "flight.destination");
    }

    #[test]
    fn test_multi_slot_goes_to_choose_property() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("home.city", ["city"]),
            PropertySchema::singleton("work.city", ["city"]),
        ]);
        let city = EntityInfo::new("city", "Paris", 0, 5).with_metrics(5);
        let resolution = run(&schema, vec![city], &[]);
        let queues = &resolution.queues;

        assert!(queues.set_property.is_empty());
        assert_eq!(queues.choose_property.len(), 1);
        assert_eq!(
            queues.choose_property[0].slots,
            vec![SlotOp::add("home.city"), SlotOp::add("work.city")]
        );
    }

    #[test]
    fn test_expected_slot_wins() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("home.city", ["city"]),
            PropertySchema::singleton("work.city", ["city"]),
        ]);
        let city = EntityInfo::new("city", "Paris", 0, 5).with_metrics(5);
        let resolution = run(&schema, vec![city], &["work.city".to_string()]);
        let queues = &resolution.queues;

        assert!(queues.choose_property.is_empty());
        assert_eq!(queues.set_property.len(), 1);
        assert_eq!(queues.set_property[0].property, "work.city");
        assert!(queues.set_property[0].expected);
    }

    #[test]
    fn test_role_qualified_entity_wins_overlap() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("age", ["age"]),
            PropertySchema::singleton("count", ["number"]),
        ]);
        let number = EntityInfo::new("number", "4", 4, 5).with_metrics(10);
        let age = EntityInfo::new("age", "4", 4, 6)
            .with_role("years")
            .with_metrics(10);
        let resolution = run(&schema, vec![number, age], &[]);
        let queues = &resolution.queues;

        assert_eq!(queues.set_property.len(), 1);
        assert_eq!(queues.set_property[0].property, "age");
        // Pruned, not unmatched
        assert!(queues.unknown.is_empty());
        assert_no_overlaps(&resolution);
    }

    #[test]
    fn test_priority_beats_coverage() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("when", ["datetime"]),
            PropertySchema::singleton("origin", ["city"]),
        ]);
        let date = EntityInfo::new("datetime", "may 5th", 0, 10).with_metrics(20);
        let city = EntityInfo::new("city", "May", 0, 3)
            .with_role("origin")
            .with_metrics(20);
        let resolution = run(&schema, vec![date, city], &[]);

        let properties: Vec<&str> = resolution
            .queues
            .set_property
            .iter()
            .map(|m| m.property.as_str())
            .collect();
        assert_eq!(properties, vec!["origin"]);
    }

    #[test]
    fn test_coverage_tie_break() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("when", ["datetime"]),
            PropertySchema::singleton("count", ["number"]),
        ]);
        let number = EntityInfo::new("number", "5", 4, 5).with_metrics(20);
        let date = EntityInfo::new("datetime", "may 5th", 0, 10).with_metrics(20);
        let resolution = run(&schema, vec![number, date], &[]);
        let queues = &resolution.queues;

        assert_eq!(queues.set_property.len(), 1);
        assert_eq!(queues.set_property[0].property, "when");
        assert_eq!(resolution.recognized.len(), 1);
        assert_no_overlaps(&resolution);
    }

    #[test]
    fn test_singleton_conflict() {
        let schema = FormSchema::new(vec![PropertySchema::singleton("size", ["size", "number"])]);
        let size = EntityInfo::new("size", "large", 0, 5).with_metrics(20);
        let number = EntityInfo::new("number", "12", 10, 12).with_metrics(20);
        let resolution = run(&schema, vec![size, number], &[]);
        let queues = &resolution.queues;

        assert!(queues.set_property.is_empty());
        assert!(queues.clarify_entity.is_empty());
        assert_eq!(queues.choose_entity.len(), 1);
        assert_eq!(queues.choose_entity[0].slot, SlotOp::add("size"));
        assert_eq!(queues.choose_entity[0].entities.len(), 2);
        assert_no_overlaps(&resolution);
    }

    #[test]
    fn test_array_slot_accepts_many() {
        let schema = FormSchema::new(vec![PropertySchema::array("toppings", ["topping"])]);
        let ham = EntityInfo::new("topping", "ham", 0, 3).with_metrics(20);
        let olives = EntityInfo::new("topping", "olives", 8, 14).with_metrics(20);
        let resolution = run(&schema, vec![ham, olives], &[]);
        let queues = &resolution.queues;

        assert_eq!(queues.set_property.len(), 2);
        assert!(queues.choose_entity.is_empty());
    }

    #[test]
    fn test_unlocated_occurrences_resolve_independently() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("size", ["size"]),
            PropertySchema::singleton("crust", ["crust"]),
            PropertySchema::array("toppings", ["topping"]),
        ]);
        let infos = vec![
            EntityInfo::new("topping", "ham", 0, 0).with_index(0),
            EntityInfo::new("topping", "olives", 0, 0).with_index(1),
            EntityInfo::new("topping", "onions", 0, 0).with_index(2),
            EntityInfo::new("size", "large", 0, 0),
            EntityInfo::new("crust", "thin", 0, 0),
            EntityInfo::new("color", "red", 0, 0),
        ];
        let resolution = run(&schema, infos, &[]);
        let queues = &resolution.queues;

        let set: Vec<String> = queues
            .set_property
            .iter()
            .map(|m| format!("{}={}", m.property, m.entity.value))
            .collect();
        assert_eq!(
            set,
            vec!["size=large", "crust=thin", "toppings=ham", "toppings=olives", "toppings=onions"]
        );
        assert_eq!(queues.unknown.len(), 1);
        assert_eq!(queues.unknown[0].name, "color");
        assert_eq!(resolution.recognized.len(), 5);
    }

    #[test]
    fn test_no_mapping_goes_to_unknown() {
        let color = EntityInfo::new("color", "red", 0, 3).with_metrics(30);
        let resolution = run(&flight_schema(), vec![paris("Paris".into()), color], &[]);
        let queues = &resolution.queues;

        assert_eq!(queues.unknown.len(), 1);
        assert_eq!(queues.unknown[0].name, "color");
        assert!(queues.set_property.iter().all(|m| m.entity.name != "color"));
        assert!(queues.choose_property.is_empty());
    }

    #[test]
    fn test_recognized_sorted_by_start() {
        let schema = FormSchema::new(vec![
            PropertySchema::singleton("size", ["size"]),
            PropertySchema::array("toppings", ["topping"]),
        ]);
        let ham = EntityInfo::new("topping", "ham", 0, 3).with_metrics(30);
        let size = EntityInfo::new("size", "large", 10, 20)
            .with_role("pizza")
            .with_metrics(30);
        let resolution = run(&schema, vec![ham, size], &[]);

        let starts: Vec<usize> = resolution.recognized.iter().map(|e| e.start).collect();
        assert_eq!(starts, vec![0, 10]);
    }
}
