//! Multi-step workbench actions.
//!
//! Each step takes the lab lock only for as long as it touches state. The
//! lock is never held across a completion-service call, so anything read
//! before an await is re-read by id afterwards.

use lab_assist::CompletionService;
use lab_core::{
    apply_command, chemical_from_contents, ApparatusId, ApparatusOverrides, DragPayload,
    DropAction, DropError, EventEnvelope, LabCommand, LabEvent, LabState, NewReaction,
    ParsedChemical, ReactionEffect, ReactionPrediction,
};
use lab_world::now_ms;
use serde::Serialize;
use tracing::debug;

use crate::state::{AppState, LabSession};

#[derive(Debug, Clone, Serialize)]
pub struct CombineOutcome {
    pub events: Vec<EventEnvelope>,
    /// Present when the pour happened and a prediction was made.
    pub prediction: Option<ReactionPrediction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub chemical: ParsedChemical,
    pub events: Vec<EventEnvelope>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DropOutcome {
    pub events: Vec<EventEnvelope>,
    pub chemical: Option<ParsedChemical>,
    /// Tools are accepted onto the bench but do not become apparatus.
    pub placed_tool: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropFailure {
    Stockroom(DropError),
    /// A solution was dropped without an apparatus to pour it into.
    TargetRequired,
}

impl std::fmt::Display for DropFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropFailure::Stockroom(err) => write!(f, "{err}"),
            DropFailure::TargetRequired => write!(f, "drop the solution onto an apparatus"),
        }
    }
}

impl std::error::Error for DropFailure {}

/// Builds a command from the current state and applies it under one lock.
/// `None` from `build` applies nothing. Events are published to the stream.
pub fn apply_with<S>(
    app: &AppState<S>,
    build: impl FnOnce(&LabState) -> Option<LabCommand>,
) -> Vec<EventEnvelope> {
    let events = {
        let mut guard = app.lab.lock();
        let Some(command) = build(&guard.state) else {
            return Vec::new();
        };
        let LabSession { state, rng } = &mut *guard;
        apply_command(state, command, &app.content.constants, rng, now_ms())
    };
    // No subscribers is fine.
    let _ = app.event_tx.send(events.clone());
    events
}

pub fn run_command<S>(app: &AppState<S>, command: LabCommand) -> Vec<EventEnvelope> {
    apply_with(app, |_| Some(command))
}

/// Interprets `text` and adds the result to `id` if it is still on the bench.
pub async fn parse_and_add<S: CompletionService>(
    app: &AppState<S>,
    id: ApparatusId,
    text: &str,
) -> AddOutcome {
    let chemical = app.assistant.interpreter.interpret(text).await;
    let events = run_command(
        app,
        LabCommand::AddChemical {
            id,
            chemical: Box::new(chemical.clone()),
        },
    );
    AddOutcome { chemical, events }
}

/// Pours the configured amount from `from` into `to`, predicts what happens
/// and records the reaction if `to` survived the wait.
pub async fn combine<S: CompletionService>(
    app: &AppState<S>,
    from: ApparatusId,
    to: ApparatusId,
) -> CombineOutcome {
    let mut events = run_command(
        app,
        LabCommand::Transfer {
            from: from.clone(),
            to: to.clone(),
            volume_ml: app.content.constants.pour_volume_ml,
        },
    );
    if !matches!(events.first().map(|e| &e.event), Some(LabEvent::Transferred(_))) {
        return CombineOutcome {
            events,
            prediction: None,
        };
    }

    let (a, b) = {
        let guard = app.lab.lock();
        let read = |id: &ApparatusId| {
            guard
                .state
                .apparatus(id)
                .and_then(|item| item.contents.as_ref())
                .map(chemical_from_contents)
        };
        (read(&from), read(&to))
    };
    let Some(a) = a else {
        debug!(%from, "source vanished before prediction");
        return CombineOutcome {
            events,
            prediction: None,
        };
    };

    let prediction = app.assistant.predictor.predict(&a, b.as_ref()).await;

    let recorded = apply_with(app, |state| {
        if state.apparatus(&to).is_none() {
            debug!(%to, "destination removed while predicting; dropping reaction");
            return None;
        }
        Some(LabCommand::RecordReaction {
            reaction: Box::new(NewReaction {
                a: Some(a),
                b,
                effect: ReactionEffect::from_prediction(&prediction),
                prediction: Some(prediction.clone()),
            }),
        })
    });
    events.extend(recorded);
    CombineOutcome {
        events,
        prediction: Some(prediction),
    }
}

/// Moves `id` along the bench and pours into whatever it landed next to.
pub async fn move_and_pour<S: CompletionService>(
    app: &AppState<S>,
    id: ApparatusId,
    x: f64,
) -> CombineOutcome {
    let mut events = run_command(app, LabCommand::MoveApparatus { id: id.clone(), x });
    let target = app
        .lab
        .lock()
        .state
        .find_pour_target(&id, &app.content.constants);
    match target {
        Some(target) => {
            let outcome = combine(app, id, target).await;
            events.extend(outcome.events);
            CombineOutcome {
                events,
                prediction: outcome.prediction,
            }
        }
        None => CombineOutcome {
            events,
            prediction: None,
        },
    }
}

/// Resolves a stockroom drag onto the bench. Glassware lands at `x` when
/// given, solutions fill `target`.
pub async fn drop_item<S: CompletionService>(
    app: &AppState<S>,
    payload: &DragPayload,
    x: Option<f64>,
    target: Option<ApparatusId>,
) -> Result<DropOutcome, DropFailure> {
    let action = app
        .content
        .stockroom
        .resolve_drop(payload)
        .map_err(DropFailure::Stockroom)?;
    match action {
        DropAction::CreateApparatus {
            kind,
            capacity_ml,
            variant,
        } => {
            let mut events = apply_with(app, |state| {
                let label = variant.map(|v| format!("{v} {}", state.next_label(kind, capacity_ml)));
                Some(LabCommand::AddApparatus {
                    kind,
                    capacity_ml,
                    overrides: ApparatusOverrides {
                        label,
                        ..ApparatusOverrides::default()
                    },
                })
            });
            let added = events.iter().find_map(|e| match &e.event {
                LabEvent::ApparatusAdded { apparatus_id, .. } => Some(apparatus_id.clone()),
                _ => None,
            });
            if let (Some(id), Some(x)) = (added, x) {
                events.extend(run_command(app, LabCommand::MoveApparatus { id, x }));
            }
            Ok(DropOutcome {
                events,
                ..DropOutcome::default()
            })
        }
        DropAction::FillWith { description } => {
            let target = target.ok_or(DropFailure::TargetRequired)?;
            let added = parse_and_add(app, target, &description).await;
            Ok(DropOutcome {
                events: added.events,
                chemical: Some(added.chemical),
                placed_tool: None,
            })
        }
        DropAction::PlaceTool { name } => Ok(DropOutcome {
            placed_tool: Some(name),
            ..DropOutcome::default()
        }),
    }
}
