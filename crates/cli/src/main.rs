//! Form replay entry point
//!
//! Replays recorded recognizer turns through a form dialog and prints what
//! each turn produced as JSON:
//!
//! ```text
//! slotfill <turns.json> [schema.yaml]
//! ```
//!
//! The turns file holds an array of `{ "text", "entities", "expected" }`
//! objects. The schema comes from the second argument or `schema_path` in
//! the settings.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use slotfill_config::{init_tracing, load_settings, Settings};
use slotfill_form::{FormDialog, FormEvent, FormState, RecognizerResult, TurnOutcome};

/// One recorded turn
#[derive(Debug, Deserialize)]
struct RecordedTurn {
    #[serde(flatten)]
    input: RecognizerResult,
    /// Properties being prompted for when the turn arrived
    #[serde(default)]
    expected: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnReport<'a> {
    outcome: TurnOutcome,
    /// Events emitted while draining, last one awaiting the user
    events: Vec<&'static str>,
    state: &'a FormState,
}

fn main() -> Result<()> {
    let env = std::env::var("SLOTFILL_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };
    init_tracing(&settings);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(turns_path) = args.first() else {
        bail!("usage: slotfill <turns.json> [schema]");
    };
    let schema_path = match args.get(1).or(settings.schema_path.as_ref()) {
        Some(path) => path.clone(),
        None => bail!("no schema given and no schema_path configured"),
    };

    let dialog = FormDialog::from_file(&schema_path, settings.form.clone())
        .with_context(|| format!("Failed to build form from {}", schema_path))?;
    let turns = read_turns(Path::new(turns_path))?;

    tracing::info!(
        schema = %schema_path,
        turns = turns.len(),
        "Replaying recorded turns"
    );

    let mut state = dialog.new_state();
    for recorded in &turns {
        let outcome = dialog.process_turn(&mut state, &recorded.input, &recorded.expected);
        let events = drain(&dialog, &mut state);

        let report = TurnReport {
            outcome,
            events,
            state: &state,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(missing) = state.next_missing() {
        tracing::info!(property = missing, "Form incomplete");
    }
    Ok(())
}

fn read_turns(path: &Path) -> Result<Vec<RecordedTurn>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read turns from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse turns in {}", path.display()))
}

/// Commit events until one needs a user answer
fn drain(dialog: &FormDialog, state: &mut FormState) -> Vec<&'static str> {
    let mut events = Vec::new();
    loop {
        let event = dialog.next_event(state);
        events.push(event.name());
        if matches!(event, FormEvent::Ask) || !dialog.apply_event(state, &event) {
            break;
        }
    }
    events
}
