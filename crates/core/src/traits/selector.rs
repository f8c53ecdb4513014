//! Trigger selection
//!
//! Rules are declared once per dialog. Each turn a selector narrows them to
//! the candidates that may run; selectors can be stacked so an outer
//! selector filters what an inner one proposes.

use crate::entity::EntityMap;

/// A declarative rule that maps an entity onto a property
pub trait Trigger {
    /// Property the rule writes
    fn property(&self) -> &str;

    /// Entity name the rule reads
    fn entity(&self) -> &str;

    /// Whether the rule's condition holds for this turn's entities
    fn fires(&self, entities: &EntityMap) -> bool;
}

/// Narrows declared triggers to this turn's candidates
pub trait TriggerSelector: Send + Sync {
    /// Indices into `triggers` of the selected candidates, in order
    fn select<T: Trigger>(&self, triggers: &[T], entities: &EntityMap) -> Vec<usize>;
}

/// Selects every trigger whose condition holds, in declaration order
#[derive(Debug, Clone, Copy, Default)]
pub struct FiringRuleSelector;

impl TriggerSelector for FiringRuleSelector {
    fn select<T: Trigger>(&self, triggers: &[T], entities: &EntityMap) -> Vec<usize> {
        triggers
            .iter()
            .enumerate()
            .filter(|(_, trigger)| trigger.fires(entities))
            .map(|(index, _)| index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityInfo;

    struct Present(&'static str);

    impl Trigger for Present {
        fn property(&self) -> &str {
            self.0
        }

        fn entity(&self) -> &str {
            self.0
        }

        fn fires(&self, entities: &EntityMap) -> bool {
            entities.count(self.0) > 0
        }
    }

    #[test]
    fn test_firing_selector_keeps_order() {
        let entities: EntityMap = vec![
            EntityInfo::new("size", "large", 0, 5),
            EntityInfo::new("topping", "ham", 10, 13),
        ]
        .into_iter()
        .collect();

        let triggers = [Present("topping"), Present("crust"), Present("size")];
        assert_eq!(FiringRuleSelector.select(&triggers, &entities), vec![0, 2]);
    }
}
