//! Form dialog turn processing
//!
//! `FormDialog` is built once per form definition and shared; all per-turn
//! data lives in the caller's `FormState`. A turn is processed with
//! `process_turn`, after which the host drains work with `next_event` until
//! it gets `FormEvent::Ask`.

use serde::Serialize;
use slotfill_config::{FormSchemaFile, FormSettings};
use slotfill_core::{
    EntityInfo, EntityMap, FiringRuleSelector, FormSchema, SchemaLookup, TriggerSelector,
};
use std::path::Path;
use std::sync::Arc;

use crate::candidates::{generate_candidates, EntityToProperty};
use crate::normalize::{normalize_entities, RecognizerResult};
use crate::queues::{events, FormEvent};
use crate::resolver::resolve;
use crate::rules::{generate_rules, FormRule};
use crate::selector::SlotMapSelector;
use crate::state::FormState;
use crate::Result;

/// What one turn produced
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub turn: u32,
    /// Entities consumed this turn, ordered by start
    pub recognized: Vec<EntityInfo>,
    /// Utterance segments no recognized entity covers
    pub unrecognized: Vec<String>,
    /// Entities that matched no property
    pub unknown: Vec<EntityInfo>,
    /// Rules allowed to run for this turn
    pub selected_rules: Vec<FormRule>,
}

pub struct FormDialog {
    schema: Arc<FormSchema>,
    rules: Vec<FormRule>,
    settings: FormSettings,
}

impl FormDialog {
    /// Build a dialog, generating its rules
    ///
    /// Fails on schemas the rules cannot express, such as nested properties.
    pub fn new(schema: Arc<FormSchema>, settings: FormSettings) -> Result<Self> {
        let rules = generate_rules(&schema)?;
        tracing::info!(
            properties = schema.properties().len(),
            rules = rules.len(),
            "Form dialog ready"
        );
        Ok(Self {
            schema,
            rules,
            settings,
        })
    }

    /// Load the schema from a JSON, YAML or TOML file
    pub fn from_file<P: AsRef<Path>>(path: P, settings: FormSettings) -> Result<Self> {
        let schema = FormSchemaFile::load(path)?;
        Self::new(Arc::new(schema), settings)
    }

    pub fn schema(&self) -> &Arc<FormSchema> {
        &self.schema
    }

    pub fn rules(&self) -> &[FormRule] {
        &self.rules
    }

    pub fn settings(&self) -> &FormSettings {
        &self.settings
    }

    /// Fresh state for a new conversation
    pub fn new_state(&self) -> FormState {
        FormState::new(&self.schema)
    }

    /// Process one turn of recognizer output
    ///
    /// `expected` lists the properties the host is prompting for. New work
    /// is merged into `state.queues`.
    pub fn process_turn(
        &self,
        state: &mut FormState,
        input: &RecognizerResult,
        expected: &[String],
    ) -> TurnOutcome {
        state.turn += 1;
        let turn = state.turn;

        let mut entities = normalize_entities(&input.text, &input.entities, turn, &self.settings);
        if expected.iter().any(|e| e == &self.settings.utterance_entity) {
            entities.insert(self.utterance_entity(&input.text, turn));
        }

        let mut recognized = self.update_last_event(state, &mut entities);
        let snapshot = entities.clone();

        let candidates = generate_candidates(&entities, self.schema.as_ref(), expected);
        let mut resolution = resolve(candidates, &mut entities, self.schema.as_ref());
        // An unclaimed utterance is not an unknown entity
        resolution
            .queues
            .unknown
            .retain(|e| e.name != self.settings.utterance_entity);

        recognized.extend(resolution.recognized);
        recognized.sort_by_key(|e| e.start);
        let unrecognized = split_utterance(&input.text, &recognized);
        let unknown = resolution.queues.unknown.clone();

        let selector = SlotMapSelector::new(FiringRuleSelector, &resolution.queues);
        let selected_rules = selector
            .select(&self.rules, &snapshot)
            .into_iter()
            .map(|index| self.rules[index].clone())
            .collect();

        state.queues.merge(resolution.queues);
        if self.settings.merge_previous_turns {
            state.queues.combine_old(turn, self.schema.as_ref());
        }

        tracing::debug!(
            turn,
            recognized = recognized.len(),
            unknown = unknown.len(),
            pending_set = state.queues.set_property.len(),
            pending_clarify = state.queues.clarify_entity.len(),
            pending_choices = state.queues.choose_property.len() + state.queues.choose_entity.len(),
            "Processed turn"
        );

        TurnOutcome {
            turn,
            recognized,
            unrecognized,
            unknown,
            selected_rules,
        }
    }

    /// Emit the next unit of work
    ///
    /// The item behind the previously emitted event is treated as handled
    /// and dequeued first.
    pub fn next_event(&self, state: &mut FormState) -> FormEvent {
        if let Some(last) = state.last_event.take() {
            state.queues.dequeue_event(&last);
        }

        let event = state.queues.peek_event();
        state.last_event = Some(event.name().to_string());
        tracing::debug!(event = event.name(), turn = state.turn, "Next form event");
        event
    }

    /// Commit a set or clear event to the state
    ///
    /// Returns false for events that need a user answer first.
    pub fn apply_event(&self, state: &mut FormState, event: &FormEvent) -> bool {
        match event {
            FormEvent::SetProperty(mapping) => {
                state.apply_set(mapping, self.schema.is_array(&mapping.property));
                true
            }
            FormEvent::ClearProperty(property) => {
                state.clear_property(property);
                true
            }
            _ => false,
        }
    }

    fn utterance_entity(&self, text: &str, turn: u32) -> EntityInfo {
        let mut info = EntityInfo::new(
            self.settings.utterance_entity.as_str(),
            text,
            0,
            text.chars().count(),
        )
        .with_text(text)
        .with_type("string")
        .with_turn(turn);
        info.priority = i32::MAX;
        info.coverage = 1.0;
        info
    }

    /// Apply this turn's answer to a pending clarification or property choice
    ///
    /// The last-event marker is dropped either way; an unresolved item stays
    /// at the front of its queue and is emitted again.
    fn update_last_event(&self, state: &mut FormState, entities: &mut EntityMap) -> Vec<EntityInfo> {
        let resolved = match state.last_event.clone().as_deref() {
            Some(events::CLARIFY_ENTITY) => {
                state.last_event = None;
                self.resolve_clarification(state, entities)
            }
            Some(events::CHOOSE_PROPERTY) => {
                state.last_event = None;
                self.resolve_property_choice(state, entities)
            }
            _ => None,
        };

        let Some(name) = resolved else {
            return Vec::new();
        };
        entities.take(&name)
    }

    /// Narrow the front clarification to the one choice this turn repeats
    ///
    /// Returns the entity name whose occurrence answered it.
    fn resolve_clarification(&self, state: &mut FormState, entities: &EntityMap) -> Option<String> {
        let pending = state.queues.clarify_entity.first()?;
        let answers = entities.get(&pending.entity.name);
        if answers.len() != 1 {
            return None;
        }
        let answer = &answers[0];

        let found = answer.value.to_list();
        let mut common: Vec<_> = pending
            .entity
            .value
            .to_list()
            .into_iter()
            .filter(|choice| found.contains(choice))
            .collect();
        if common.len() != 1 {
            tracing::debug!(
                entity = %answer.name,
                matches = common.len(),
                "Answer does not resolve clarification"
            );
            return None;
        }

        let mut entity = answer.clone();
        entity.value = common.remove(0);
        let resolved = EntityToProperty {
            entity,
            property: pending.property.clone(),
            operation: pending.operation,
            expected: true,
        };

        tracing::debug!(
            property = %resolved.property,
            value = %resolved.entity.value,
            "Clarification resolved"
        );
        let name = answer.name.clone();
        state.queues.clarify_entity.remove(0);
        state.queues.set_property.push(resolved);
        Some(name)
    }

    /// Pick the property named by this turn's property entity
    fn resolve_property_choice(&self, state: &mut FormState, entities: &EntityMap) -> Option<String> {
        let pending = state.queues.choose_property.first()?;
        let answers = entities.get(&self.settings.property_entity);
        if answers.len() != 1 {
            return None;
        }

        let name = answers[0].value.first_str()?;
        let Some(slot) = pending.slots.iter().find(|s| s.slot == name) else {
            tracing::debug!(property = name, "Answer names no pending property");
            return None;
        };

        let resolved = EntityToProperty::new(pending.entity.clone(), slot.slot.clone(), true)
            .with_operation(slot.operation);

        tracing::debug!(property = %resolved.property, "Property choice resolved");
        state.queues.choose_property.remove(0);
        state.queues.add_mapping(resolved);
        Some(self.settings.property_entity.clone())
    }
}

/// Trimmed, non-empty utterance segments outside every recognized span
fn split_utterance(utterance: &str, recognized: &[EntityInfo]) -> Vec<String> {
    let chars: Vec<char> = utterance.chars().collect();
    let mut segments = Vec::new();
    let mut current = 0;

    let mut push = |from: usize, to: usize| {
        let segment: String = chars[from..to].iter().collect();
        let segment = segment.trim();
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
    };

    for entity in recognized {
        let start = entity.start.min(chars.len());
        if start > current {
            push(current, start);
        }
        current = current.max(entity.end.min(chars.len()));
    }
    if current < chars.len() {
        push(current, chars.len());
    }

    segments
}
