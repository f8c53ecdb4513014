//! Rule selection narrowed by entity resolution

use slotfill_core::{EntityMap, Trigger, TriggerSelector};
use std::collections::HashSet;

use crate::queues::EventQueues;

/// Keeps only the rules whose (property, entity) pair the resolver queued
/// to set this turn
///
/// Wraps any inner selector, typically `FiringRuleSelector`, so at most the
/// assignments that survived disambiguation can run.
pub struct SlotMapSelector<S> {
    inner: S,
    approved: HashSet<(String, String)>,
}

impl<S: TriggerSelector> SlotMapSelector<S> {
    pub fn new(inner: S, queues: &EventQueues) -> Self {
        let approved = queues
            .set_property
            .iter()
            .map(|m| (m.property.clone(), m.entity.name.clone()))
            .collect();
        Self { inner, approved }
    }

    fn is_approved(&self, property: &str, entity: &str) -> bool {
        self.approved
            .contains(&(property.to_string(), entity.to_string()))
    }
}

impl<S: TriggerSelector> TriggerSelector for SlotMapSelector<S> {
    fn select<T: Trigger>(&self, triggers: &[T], entities: &EntityMap) -> Vec<usize> {
        let selected: Vec<usize> = self
            .inner
            .select(triggers, entities)
            .into_iter()
            .filter(|&index| {
                let trigger = &triggers[index];
                self.is_approved(trigger.property(), trigger.entity())
            })
            .collect();

        tracing::trace!(selected = selected.len(), "Selected form rules");
        selected
    }
}
