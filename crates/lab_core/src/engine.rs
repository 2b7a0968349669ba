use rand::Rng;

use crate::store::StoreError;
use crate::{BenchConstants, EventEnvelope, LabCommand, LabEvent, LabState, TimestampMs};

/// Apply one command to the workbench.
///
/// Store failures (unknown ids, empty sources) leave the state untouched and
/// produce a single `CommandIgnored` event instead.
///
/// Returns all events produced by the command.
pub fn apply_command(
    state: &mut LabState,
    command: LabCommand,
    constants: &BenchConstants,
    rng: &mut impl Rng,
    now: TimestampMs,
) -> Vec<EventEnvelope> {
    let event = match dispatch(state, command, constants, rng, now) {
        Ok(event) => event,
        Err(err) => LabEvent::CommandIgnored {
            reason: err.to_string(),
        },
    };
    vec![crate::emit(&mut state.counters, now, event)]
}

fn dispatch(
    state: &mut LabState,
    command: LabCommand,
    constants: &BenchConstants,
    rng: &mut impl Rng,
    now: TimestampMs,
) -> Result<LabEvent, StoreError> {
    let event = match command {
        LabCommand::AddApparatus {
            kind,
            capacity_ml,
            overrides,
        } => {
            let apparatus_id = state.add_apparatus(kind, capacity_ml, overrides, constants, rng);
            let label = state
                .apparatus(&apparatus_id)
                .map(|item| item.label.clone())
                .unwrap_or_default();
            LabEvent::ApparatusAdded {
                apparatus_id,
                label,
            }
        }
        LabCommand::UpdateApparatus { id, patch } => {
            state.update_apparatus(&id, patch, constants)?;
            LabEvent::ApparatusUpdated { apparatus_id: id }
        }
        LabCommand::MoveApparatus { id, x } => {
            let x = state.move_apparatus(&id, x, constants)?;
            LabEvent::ApparatusMoved {
                apparatus_id: id,
                x,
            }
        }
        LabCommand::RemoveApparatus { id } => {
            state.remove_apparatus(&id)?;
            LabEvent::ApparatusRemoved { apparatus_id: id }
        }
        LabCommand::AddChemical { id, chemical } => {
            state.add_chemical_to(&id, &chemical)?;
            LabEvent::ChemicalAdded {
                apparatus_id: id,
                label: chemical.name,
            }
        }
        LabCommand::Transfer {
            from,
            to,
            volume_ml,
        } => LabEvent::Transferred(state.transfer(&from, &to, volume_ml, now)?),
        LabCommand::LogMeasurement {
            apparatus_id,
            kind,
            value,
        } => {
            let measurement_id =
                state.log_measurement(apparatus_id.clone(), kind, value, now, rng);
            LabEvent::MeasurementLogged {
                measurement_id,
                apparatus_id,
                kind,
                value,
            }
        }
        LabCommand::RecordReaction { reaction } => {
            let description = reaction.effect.description.clone();
            let reaction_id = state.record_reaction(*reaction, now, rng);
            LabEvent::ReactionRecorded {
                reaction_id,
                description,
            }
        }
        LabCommand::ClearWorkspace => {
            state.clear_workspace();
            LabEvent::WorkspaceCleared
        }
        LabCommand::SetZoom { zoom } => LabEvent::ZoomChanged {
            zoom: state.set_zoom(zoom),
        },
        LabCommand::SetTutorEnabled { enabled } => {
            state.set_tutor_enabled(enabled);
            LabEvent::TutorToggled { enabled }
        }
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{aqueous, base_content, make_rng};
    use crate::{ApparatusId, ApparatusKind, ApparatusOverrides, MeasurementKind};

    fn add_beaker(state: &mut LabState, rng: &mut rand_chacha::ChaCha8Rng) -> ApparatusId {
        let content = base_content();
        let events = apply_command(
            state,
            LabCommand::AddApparatus {
                kind: ApparatusKind::Beaker,
                capacity_ml: Some(100.0),
                overrides: ApparatusOverrides::default(),
            },
            &content.constants,
            rng,
            0,
        );
        match &events[0].event {
            LabEvent::ApparatusAdded { apparatus_id, .. } => apparatus_id.clone(),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn event_ids_are_sequential() {
        let mut state = LabState::default();
        let mut rng = make_rng();
        let content = base_content();
        add_beaker(&mut state, &mut rng);
        let events = apply_command(
            &mut state,
            LabCommand::SetZoom { zoom: 9.0 },
            &content.constants,
            &mut rng,
            5,
        );
        assert_eq!(events[0].id.0, "evt_000001");
        assert_eq!(events[0].timestamp, 5);
        assert_eq!(events[0].event, LabEvent::ZoomChanged { zoom: 2.0 });
    }

    #[test]
    fn unknown_target_is_reported_and_ignored() {
        let mut state = LabState::default();
        let mut rng = make_rng();
        let content = base_content();
        let events = apply_command(
            &mut state,
            LabCommand::RemoveApparatus {
                id: ApparatusId::from("ghost"),
            },
            &content.constants,
            &mut rng,
            0,
        );
        assert!(matches!(
            &events[0].event,
            LabEvent::CommandIgnored { reason } if reason.contains("ghost")
        ));
        assert!(state.apparatus.is_empty());
    }

    #[test]
    fn chemical_then_transfer_produces_transfer_event() {
        let mut state = LabState::default();
        let mut rng = make_rng();
        let content = base_content();
        let from = add_beaker(&mut state, &mut rng);
        let to = add_beaker(&mut state, &mut rng);
        let mut chemical = aqueous("HCl", Some(1.0));
        chemical.volume_ml = Some(4.0);
        apply_command(
            &mut state,
            LabCommand::AddChemical {
                id: from.clone(),
                chemical: Box::new(chemical),
            },
            &content.constants,
            &mut rng,
            1,
        );
        let events = apply_command(
            &mut state,
            LabCommand::Transfer {
                from: from.clone(),
                to: to.clone(),
                volume_ml: 10.0,
            },
            &content.constants,
            &mut rng,
            2,
        );
        match &events[0].event {
            LabEvent::Transferred(action) => {
                assert!((action.volume_ml - 4.0).abs() < 1e-9);
                assert_eq!(action.to_apparatus_id, to);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn commands_round_trip_through_json() {
        let json = r#"{"type":"LogMeasurement","apparatus_id":"-","kind":"pH","value":7.0}"#;
        let command: LabCommand = serde_json::from_str(json).unwrap();
        let mut state = LabState::default();
        let mut rng = make_rng();
        apply_command(&mut state, command, &base_content().constants, &mut rng, 0);
        assert_eq!(state.measurements.len(), 1);
        assert_eq!(state.measurements[0].kind, MeasurementKind::Ph);
    }

    #[test]
    fn negative_volume_from_json_is_dropped_before_pouring_in() {
        let mut state = LabState::default();
        let mut rng = make_rng();
        let content = base_content();
        let from = add_beaker(&mut state, &mut rng);
        let to = add_beaker(&mut state, &mut rng);
        let json = format!(
            r#"{{"type":"AddChemical","id":"{to}","chemical":{{"name":"HCl","state":"aqueous","volume_ml":-50.0}}}}"#
        );
        let command: LabCommand = serde_json::from_str(&json).unwrap();
        apply_command(&mut state, command, &content.constants, &mut rng, 1);
        let mut source = aqueous("Water", None);
        source.volume_ml = Some(25.0);
        apply_command(
            &mut state,
            LabCommand::AddChemical {
                id: from.clone(),
                chemical: Box::new(source),
            },
            &content.constants,
            &mut rng,
            2,
        );
        apply_command(
            &mut state,
            LabCommand::Transfer {
                from,
                to: to.clone(),
                volume_ml: 10.0,
            },
            &content.constants,
            &mut rng,
            3,
        );
        let volume = state.apparatus(&to).unwrap().contents.as_ref().unwrap().volume_ml;
        assert_eq!(volume, Some(10.0));
    }
}
