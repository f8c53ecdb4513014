//! Pending form work
//!
//! Resolution sorts a turn's entities into queues, one per kind of follow-up:
//!
//! | queue | event | meaning |
//! |---|---|---|
//! | `clear_property` | `clearProperty` | slot left with no surviving value |
//! | `set_property` | `setProperty` | unambiguous assignment |
//! | `choose_property` | `chooseProperty` | one entity, several candidate slots |
//! | `choose_entity` | `chooseEntity` | several entities, one singleton slot |
//! | `clarify_entity` | `clarifyEntity` | entity value lists several choices |
//!
//! Queues persist with the form state and are drained front first, one
//! event at a time.

use serde::{Deserialize, Serialize};
use slotfill_core::{EntityInfo, EntityValue, Operation, SchemaLookup, SlotOp};

use crate::candidates::EntityToProperty;

/// Event names used to drain the queues
pub mod events {
    pub const SET_PROPERTY: &str = "setProperty";
    pub const CLARIFY_ENTITY: &str = "clarifyEntity";
    pub const CHOOSE_PROPERTY: &str = "chooseProperty";
    pub const CHOOSE_ENTITY: &str = "chooseEntity";
    pub const CLEAR_PROPERTY: &str = "clearProperty";
    pub const ASK: &str = "ask";
}

/// One entity that several slots could take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotChoice {
    pub entity: EntityInfo,
    pub slots: Vec<SlotOp>,
}

/// Several entities competing for one singleton slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SingletonChoice {
    pub entities: Vec<EntityInfo>,
    pub slot: SlotOp,
}

/// Next unit of form work for the host
#[derive(Debug, Clone, PartialEq)]
pub enum FormEvent {
    ClearProperty(String),
    SetProperty(EntityToProperty),
    ChooseProperty(SlotChoice),
    ChooseEntity(SingletonChoice),
    ClarifyEntity(EntityToProperty),
    /// Nothing queued; prompt for the next missing property
    Ask,
}

impl FormEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FormEvent::ClearProperty(_) => events::CLEAR_PROPERTY,
            FormEvent::SetProperty(_) => events::SET_PROPERTY,
            FormEvent::ChooseProperty(_) => events::CHOOSE_PROPERTY,
            FormEvent::ChooseEntity(_) => events::CHOOSE_ENTITY,
            FormEvent::ClarifyEntity(_) => events::CLARIFY_ENTITY,
            FormEvent::Ask => events::ASK,
        }
    }
}

/// Queues of pending form work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueues {
    /// Entities that matched no slot
    #[serde(default)]
    pub unknown: Vec<EntityInfo>,
    #[serde(default)]
    pub set_property: Vec<EntityToProperty>,
    #[serde(default)]
    pub clarify_entity: Vec<EntityToProperty>,
    #[serde(default)]
    pub choose_property: Vec<SlotChoice>,
    #[serde(default)]
    pub choose_entity: Vec<SingletonChoice>,
    #[serde(default)]
    pub clear_property: Vec<String>,
}

impl EventQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no work is pending; `unknown` does not count
    pub fn is_empty(&self) -> bool {
        self.set_property.is_empty()
            && self.clarify_entity.is_empty()
            && self.choose_property.is_empty()
            && self.choose_entity.is_empty()
            && self.clear_property.is_empty()
    }

    /// Queue an accepted assignment
    ///
    /// An entity whose value lists several choices needs clarification; a
    /// one-element list collapses to its element.
    pub fn add_mapping(&mut self, mut mapping: EntityToProperty) {
        match mapping.entity.value.as_array().map(<[EntityValue]>::len) {
            Some(len) if len > 1 => self.clarify_entity.push(mapping),
            Some(1) => {
                mapping.entity.value = mapping.entity.value.unwrap_single();
                self.set_property.push(mapping);
            }
            _ => self.set_property.push(mapping),
        }
    }

    /// Remove the front item of the queue named by `event`
    ///
    /// Returns false for `ask`, unknown names, and empty queues.
    pub fn dequeue_event(&mut self, event: &str) -> bool {
        fn pop_front<T>(queue: &mut Vec<T>) -> bool {
            if queue.is_empty() {
                false
            } else {
                queue.remove(0);
                true
            }
        }

        match event {
            events::SET_PROPERTY => pop_front(&mut self.set_property),
            events::CLARIFY_ENTITY => pop_front(&mut self.clarify_entity),
            events::CHOOSE_PROPERTY => pop_front(&mut self.choose_property),
            events::CHOOSE_ENTITY => pop_front(&mut self.choose_entity),
            events::CLEAR_PROPERTY => pop_front(&mut self.clear_property),
            _ => false,
        }
    }

    /// Front item by drain priority
    ///
    /// Clears come first, then sets, property choices, singleton choices and
    /// clarifications.
    pub fn peek_event(&self) -> FormEvent {
        if let Some(path) = self.clear_property.first() {
            FormEvent::ClearProperty(path.clone())
        } else if let Some(mapping) = self.set_property.first() {
            FormEvent::SetProperty(mapping.clone())
        } else if let Some(choice) = self.choose_property.first() {
            FormEvent::ChooseProperty(choice.clone())
        } else if let Some(choice) = self.choose_entity.first() {
            FormEvent::ChooseEntity(choice.clone())
        } else if let Some(mapping) = self.clarify_entity.first() {
            FormEvent::ClarifyEntity(mapping.clone())
        } else {
            FormEvent::Ask
        }
    }

    /// Append another set of queues after this one
    pub fn merge(&mut self, other: EventQueues) {
        self.unknown.extend(other.unknown);
        self.set_property.extend(other.set_property);
        self.clarify_entity.extend(other.clarify_entity);
        self.choose_property.extend(other.choose_property);
        self.choose_entity.extend(other.choose_entity);
        for path in other.clear_property {
            if !self.clear_property.contains(&path) {
                self.clear_property.push(path);
            }
        }
    }

    /// Resolve singleton slots that received more than one assignment
    ///
    /// For each non-array slot with several set/clarify entries, the entries
    /// are pulled out and replaced by: a clear when every entry removes, the
    /// single survivor when exactly one adds, or a singleton choice listing
    /// every competing entity. Array slots keep all of their entries.
    pub fn analyze(&mut self, schema: &dyn SchemaLookup) {
        for slot in self.assigned_slots() {
            if schema.is_array(&slot) {
                continue;
            }

            let mappings: Vec<EntityToProperty> = self
                .set_property
                .iter()
                .chain(self.clarify_entity.iter())
                .filter(|m| m.property == slot)
                .cloned()
                .collect();
            if mappings.len() <= 1 {
                continue;
            }

            self.set_property.retain(|m| m.property != slot);
            self.clarify_entity.retain(|m| m.property != slot);

            let mut adds: Vec<EntityToProperty> = mappings
                .into_iter()
                .filter(|m| m.operation != Operation::Remove)
                .collect();

            match adds.len() {
                0 => {
                    tracing::debug!(slot = %slot, "Every operation removes, clearing slot");
                    if !self.clear_property.contains(&slot) {
                        self.clear_property.push(slot);
                    }
                }
                1 => {
                    let mapping = adds.remove(0);
                    self.add_mapping(mapping);
                }
                count => {
                    tracing::debug!(slot = %slot, competing = count, "Singleton slot is ambiguous");
                    let op = adds[0].slot_op();
                    self.choose_entity.push(SingletonChoice {
                        entities: adds.into_iter().map(|m| m.entity).collect(),
                        slot: op,
                    });
                }
            }
        }
    }

    /// Drop pending work from earlier turns on singleton slots touched this turn
    pub fn combine_old(&mut self, turn: u32, schema: &dyn SchemaLookup) {
        let touched: Vec<String> = self
            .set_property
            .iter()
            .chain(self.clarify_entity.iter())
            .filter(|m| m.entity.turn == turn)
            .map(|m| m.property.clone())
            .chain(
                self.choose_property
                    .iter()
                    .filter(|c| c.entity.turn == turn)
                    .flat_map(|c| c.slots.iter().map(|s| s.slot.clone())),
            )
            .filter(|slot| !schema.is_array(slot))
            .collect();

        if touched.is_empty() {
            return;
        }

        let stale = |property: &str, entity_turn: u32| {
            entity_turn != turn && touched.iter().any(|t| t == property)
        };

        let before = self.set_property.len() + self.clarify_entity.len() + self.choose_property.len();
        self.set_property.retain(|m| !stale(&m.property, m.entity.turn));
        self.clarify_entity.retain(|m| !stale(&m.property, m.entity.turn));
        self.choose_property
            .retain(|c| !c.slots.iter().any(|s| stale(&s.slot, c.entity.turn)));
        let after = self.set_property.len() + self.clarify_entity.len() + self.choose_property.len();

        if before != after {
            tracing::debug!(turn, dropped = before - after, "Dropped superseded operations");
        }
    }

    /// Slots with set/clarify entries, in first-seen order
    fn assigned_slots(&self) -> Vec<String> {
        let mut slots: Vec<String> = Vec::new();
        for mapping in self.set_property.iter().chain(self.clarify_entity.iter()) {
            if !slots.contains(&mapping.property) {
                slots.push(mapping.property.clone());
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotfill_core::{FormSchema, PropertySchema};

    fn schema() -> FormSchema {
        FormSchema::new(vec![
            PropertySchema::singleton("size", ["size"]),
            PropertySchema::array("toppings", ["topping"]),
        ])
    }

    fn mapping(name: &str, value: EntityValue, start: usize, property: &str) -> EntityToProperty {
        EntityToProperty::new(EntityInfo::new(name, value, start, start + 3), property, false)
    }

    #[test]
    fn test_add_mapping_classifies_values() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        queues.add_mapping(mapping("topping", EntityValue::choices(["ham"]), 10, "toppings"));
        queues.add_mapping(mapping(
            "topping",
            EntityValue::choices(["green peppers", "red peppers"]),
            20,
            "toppings",
        ));

        assert_eq!(queues.set_property.len(), 2);
        assert_eq!(queues.set_property[1].entity.value, EntityValue::string("ham"));
        assert_eq!(queues.clarify_entity.len(), 1);
    }

    #[test]
    fn test_dequeue_event() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        queues.clear_property.push("toppings".to_string());

        assert!(!queues.dequeue_event(events::ASK));
        assert!(!queues.dequeue_event("bogus"));
        assert!(!queues.dequeue_event(events::CLARIFY_ENTITY));
        assert!(queues.dequeue_event(events::SET_PROPERTY));
        assert!(!queues.dequeue_event(events::SET_PROPERTY));
        assert!(queues.dequeue_event(events::CLEAR_PROPERTY));
        assert!(queues.is_empty());
    }

    #[test]
    fn test_peek_priority() {
        let mut queues = EventQueues::new();
        assert_eq!(queues.peek_event(), FormEvent::Ask);

        queues.add_mapping(mapping("topping", EntityValue::choices(["a", "b"]), 0, "toppings"));
        assert_eq!(queues.peek_event().name(), events::CLARIFY_ENTITY);

        queues.choose_property.push(SlotChoice {
            entity: EntityInfo::new("city", "Paris", 0, 5),
            slots: vec![SlotOp::add("home"), SlotOp::add("work")],
        });
        assert_eq!(queues.peek_event().name(), events::CHOOSE_PROPERTY);

        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        assert_eq!(queues.peek_event().name(), events::SET_PROPERTY);

        queues.clear_property.push("size".to_string());
        assert_eq!(queues.peek_event(), FormEvent::ClearProperty("size".to_string()));
    }

    #[test]
    fn test_analyze_singleton_conflict() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        queues.add_mapping(mapping("size", "small".into(), 10, "size"));

        queues.analyze(&schema());

        assert!(queues.set_property.is_empty());
        assert_eq!(queues.choose_entity.len(), 1);
        let choice = &queues.choose_entity[0];
        assert_eq!(choice.slot, SlotOp::add("size"));
        assert_eq!(choice.entities.len(), 2);
    }

    #[test]
    fn test_analyze_single_add_survives() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        queues.add_mapping(mapping("size", "small".into(), 10, "size").with_operation(Operation::Remove));

        queues.analyze(&schema());

        assert_eq!(queues.set_property.len(), 1);
        assert_eq!(queues.set_property[0].entity.value, EntityValue::string("large"));
        assert!(queues.choose_entity.is_empty());
    }

    #[test]
    fn test_analyze_all_removes_clears() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size").with_operation(Operation::Remove));
        queues.add_mapping(mapping("size", "small".into(), 10, "size").with_operation(Operation::Remove));

        queues.analyze(&schema());

        assert!(queues.set_property.is_empty());
        assert_eq!(queues.clear_property, vec!["size".to_string()]);
    }

    #[test]
    fn test_analyze_array_slot_exempt() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("topping", "ham".into(), 0, "toppings"));
        queues.add_mapping(mapping("topping", "olives".into(), 10, "toppings"));

        queues.analyze(&schema());

        assert_eq!(queues.set_property.len(), 2);
        assert!(queues.choose_entity.is_empty());
    }

    #[test]
    fn test_merge_and_combine_old() {
        let schema = schema();
        let mut queues = EventQueues::new();
        let old = EntityToProperty::new(EntityInfo::new("size", "large", 0, 5).with_turn(1), "size", false);
        let old_topping =
            EntityToProperty::new(EntityInfo::new("topping", "ham", 9, 12).with_turn(1), "toppings", false);
        queues.add_mapping(old);
        queues.add_mapping(old_topping);

        let mut newer = EventQueues::new();
        newer.add_mapping(EntityToProperty::new(
            EntityInfo::new("size", "small", 0, 5).with_turn(2),
            "size",
            false,
        ));
        newer.add_mapping(EntityToProperty::new(
            EntityInfo::new("topping", "olives", 9, 15).with_turn(2),
            "toppings",
            false,
        ));

        queues.merge(newer);
        assert_eq!(queues.set_property.len(), 4);

        queues.combine_old(2, &schema);

        let values: Vec<String> = queues
            .set_property
            .iter()
            .map(|m| m.entity.value.to_string())
            .collect();
        // The singleton keeps only the newest value; the array keeps both
        assert_eq!(values, vec!["ham", "small", "olives"]);
    }

    #[test]
    fn test_serde_roundtrip_names() {
        let mut queues = EventQueues::new();
        queues.add_mapping(mapping("size", "large".into(), 0, "size"));
        let json = serde_json::to_value(&queues).unwrap();
        assert!(json.get("setProperty").is_some());
        assert!(json.get("chooseEntity").is_some());

        let back: EventQueues = serde_json::from_value(json).unwrap();
        assert_eq!(back, queues);
    }
}
