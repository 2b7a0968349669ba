//! Apparatus and contents store.
//!
//! `LabState` owns every apparatus item and the transfer, measurement and
//! reaction logs. Operations on an unknown id return
//! [`StoreError::ApparatusNotFound`] and leave the state untouched.

use rand::Rng;

use crate::color::{blend, DEFAULT_CONTENTS_COLOR};
use crate::id::{new_apparatus_id, new_measurement_id, new_reaction_id, sequence_letter};
use crate::{
    ApparatusContents, ApparatusId, ApparatusItem, ApparatusKind, ApparatusOverrides,
    ApparatusPatch, BenchConstants, LabState, MeasurementEntry, MeasurementId, MeasurementKind,
    NewReaction, ParsedChemical, Position, ReactionId, ReactionRecord, TimestampMs,
    TransferAction,
};

pub const ZOOM_MIN: f64 = 0.5;
pub const ZOOM_MAX: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    ApparatusNotFound(ApparatusId),
    /// Transfer source holds nothing to pour.
    SourceEmpty(ApparatusId),
    /// Transfer source and destination are the same item.
    SameApparatus(ApparatusId),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::ApparatusNotFound(id) => write!(f, "apparatus {id} not found"),
            StoreError::SourceEmpty(id) => write!(f, "apparatus {id} has no contents"),
            StoreError::SameApparatus(id) => write!(f, "cannot transfer {id} into itself"),
        }
    }
}

impl std::error::Error for StoreError {}

impl LabState {
    pub fn apparatus(&self, id: &ApparatusId) -> Option<&ApparatusItem> {
        self.apparatus.iter().find(|item| &item.id == id)
    }

    fn apparatus_mut(&mut self, id: &ApparatusId) -> Result<&mut ApparatusItem, StoreError> {
        self.apparatus
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| StoreError::ApparatusNotFound(id.clone()))
    }

    fn fresh_apparatus_id(&self, rng: &mut impl Rng) -> ApparatusId {
        loop {
            let candidate = new_apparatus_id(rng);
            if self.apparatus(&candidate).is_none() {
                return candidate;
            }
        }
    }

    /// Label the next added item of this kind would receive:
    /// `"<kind> <capacity> <letter>"`, letter from the current item count.
    pub fn next_label(&self, kind: ApparatusKind, capacity_ml: Option<f64>) -> String {
        let mut parts = vec![kind.name().to_string()];
        if let Some(capacity) = capacity_ml {
            parts.push(format!("{capacity}"));
        }
        parts.push(sequence_letter(self.apparatus.len()));
        parts.join(" ")
    }

    /// Appends a new item on the shelf and returns its id. Supplied overrides
    /// replace the generated defaults; an override id that is already taken
    /// is replaced by a fresh one.
    pub fn add_apparatus(
        &mut self,
        kind: ApparatusKind,
        capacity_ml: Option<f64>,
        overrides: ApparatusOverrides,
        constants: &BenchConstants,
        rng: &mut impl Rng,
    ) -> ApparatusId {
        let count = self.apparatus.len();
        let id = match overrides
            .id
            .filter(|candidate| self.apparatus(candidate).is_none())
        {
            Some(id) => id,
            None => self.fresh_apparatus_id(rng),
        };
        let label = overrides
            .label
            .unwrap_or_else(|| self.next_label(kind, capacity_ml));
        let position = overrides.position.unwrap_or(Position {
            x: constants.shelf_start_x_px + count as f64 * constants.shelf_step_px,
            y: constants.baseline_y_px,
        });
        self.apparatus.push(ApparatusItem {
            id: id.clone(),
            kind,
            capacity_ml,
            label,
            position,
            contents: overrides.contents.map(sanitize_contents),
        });
        id
    }

    /// Merges the set fields of `patch` into the item. A patched position is
    /// held to the bench like a drag.
    pub fn update_apparatus(
        &mut self,
        id: &ApparatusId,
        patch: ApparatusPatch,
        constants: &BenchConstants,
    ) -> Result<(), StoreError> {
        let item = self.apparatus_mut(id)?;
        if let Some(kind) = patch.kind {
            item.kind = kind;
        }
        if let Some(capacity) = patch.capacity_ml {
            item.capacity_ml = Some(capacity);
        }
        if let Some(label) = patch.label {
            item.label = label;
        }
        if let Some(position) = patch.position {
            item.position = Position {
                x: clamp_to_bench(position.x, item.position.x, constants),
                y: constants.baseline_y_px,
            };
        }
        if let Some(contents) = patch.contents {
            item.contents = Some(sanitize_contents(contents));
        }
        Ok(())
    }

    /// Drag end: clamps x to the bench bounds and returns the applied x.
    /// y stays on the baseline.
    pub fn move_apparatus(
        &mut self,
        id: &ApparatusId,
        x: f64,
        constants: &BenchConstants,
    ) -> Result<f64, StoreError> {
        let item = self.apparatus_mut(id)?;
        let clamped = clamp_to_bench(x, item.position.x, constants);
        item.position = Position {
            x: clamped,
            y: constants.baseline_y_px,
        };
        Ok(clamped)
    }

    /// First other item whose x lies within pour range of `id`.
    pub fn find_pour_target(
        &self,
        id: &ApparatusId,
        constants: &BenchConstants,
    ) -> Option<ApparatusId> {
        let moved = self.apparatus(id)?;
        self.apparatus
            .iter()
            .find(|other| {
                other.id != moved.id
                    && (other.position.x - moved.position.x).abs() < constants.pour_proximity_px
            })
            .map(|other| other.id.clone())
    }

    pub fn remove_apparatus(&mut self, id: &ApparatusId) -> Result<ApparatusItem, StoreError> {
        let index = self
            .apparatus
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| StoreError::ApparatusNotFound(id.clone()))?;
        Ok(self.apparatus.remove(index))
    }

    /// Replaces the item's contents with the chemical.
    pub fn add_chemical_to(
        &mut self,
        id: &ApparatusId,
        chemical: &ParsedChemical,
    ) -> Result<(), StoreError> {
        let item = self.apparatus_mut(id)?;
        item.contents = Some(contents_from_chemical(chemical));
        Ok(())
    }

    /// Pours up to `volume_ml` from one item into another.
    ///
    /// The amount moved is `min(volume_ml, source volume)`; the source never
    /// goes negative and the destination gains exactly what the source lost.
    /// The logged transfer carries the clamped amount.
    pub fn transfer(
        &mut self,
        from: &ApparatusId,
        to: &ApparatusId,
        volume_ml: f64,
        now: TimestampMs,
    ) -> Result<TransferAction, StoreError> {
        if from == to {
            return Err(StoreError::SameApparatus(from.clone()));
        }
        if self.apparatus(to).is_none() {
            return Err(StoreError::ApparatusNotFound(to.clone()));
        }
        let source_item = self.apparatus_mut(from)?;
        let source = source_item
            .contents
            .as_mut()
            .ok_or_else(|| StoreError::SourceEmpty(from.clone()))?;

        let available = source.volume_ml.unwrap_or(0.0).max(0.0);
        let requested = if volume_ml.is_finite() {
            volume_ml.max(0.0)
        } else {
            0.0
        };
        let actual = requested.min(available);
        source.volume_ml = Some((available - actual).max(0.0));

        let source_color = source.color.unwrap_or(DEFAULT_CONTENTS_COLOR);
        let source_label = source.label.clone();
        let source_description = source.description.clone();

        let destination = self.apparatus_mut(to)?;
        let merged = match destination.contents.take() {
            Some(existing) => ApparatusContents {
                label: if existing.label.is_empty() {
                    source_label
                } else {
                    existing.label
                },
                color: Some(match existing.color {
                    Some(color) => blend(Some(color), Some(source_color)),
                    None => source_color,
                }),
                volume_ml: Some(existing.volume_ml.unwrap_or(0.0) + actual),
                mass_g: existing.mass_g,
                state: crate::MatterState::Liquid,
                description: existing
                    .description
                    .filter(|text| !text.is_empty())
                    .or(source_description),
            },
            None => ApparatusContents {
                label: source_label,
                color: Some(source_color),
                volume_ml: Some(actual),
                mass_g: None,
                state: crate::MatterState::Liquid,
                description: source_description,
            },
        };
        destination.contents = Some(merged);

        let action = TransferAction {
            from_apparatus_id: from.clone(),
            to_apparatus_id: to.clone(),
            volume_ml: actual,
            timestamp: now,
        };
        self.transfers.push(action.clone());
        Ok(action)
    }

    /// Appends a reading. The apparatus id is recorded as given.
    pub fn log_measurement(
        &mut self,
        apparatus_id: ApparatusId,
        kind: MeasurementKind,
        value: f64,
        now: TimestampMs,
        rng: &mut impl Rng,
    ) -> MeasurementId {
        let id = new_measurement_id(rng);
        self.measurements.push(MeasurementEntry {
            id: id.clone(),
            apparatus_id,
            kind,
            value,
            timestamp: now,
        });
        id
    }

    /// Readings of one kind, oldest first.
    pub fn measurements_of(&self, kind: MeasurementKind) -> impl Iterator<Item = &MeasurementEntry> {
        self.measurements.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn record_reaction(
        &mut self,
        reaction: NewReaction,
        now: TimestampMs,
        rng: &mut impl Rng,
    ) -> ReactionId {
        let id = new_reaction_id(rng);
        let NewReaction {
            a,
            b,
            effect,
            prediction,
        } = reaction;
        self.reaction_history.push(ReactionRecord {
            id: id.clone(),
            a,
            b,
            effect,
            prediction,
            timestamp: now,
        });
        id
    }

    /// Empties the bench and all logs. Zoom and the tutor flag survive.
    pub fn clear_workspace(&mut self) {
        self.apparatus.clear();
        self.transfers.clear();
        self.measurements.clear();
        self.reaction_history.clear();
    }

    /// Clamps to `[ZOOM_MIN, ZOOM_MAX]` and returns the applied zoom. NaN is
    /// ignored.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        if !zoom.is_nan() {
            self.zoom = zoom.clamp(ZOOM_MIN, ZOOM_MAX);
        }
        self.zoom
    }

    pub fn set_tutor_enabled(&mut self, enabled: bool) {
        self.tutor_enabled = enabled;
    }
}

/// Maps a chemical record onto apparatus contents. Aqueous becomes liquid and
/// the description is `"<formula or name>[ <c>M]"`.
pub fn contents_from_chemical(chemical: &ParsedChemical) -> ApparatusContents {
    let mut description = chemical.formula_or_name().to_string();
    if let Some(concentration) = chemical.concentration_m.filter(|c| *c > 0.0) {
        description.push_str(&format!(" {concentration}M"));
    }
    ApparatusContents {
        label: chemical.name.clone(),
        color: Some(chemical.color.unwrap_or(DEFAULT_CONTENTS_COLOR)),
        volume_ml: non_negative(chemical.volume_ml),
        mass_g: None,
        state: chemical.state.as_matter(),
        description: Some(description),
    }
}

/// Amounts that are negative or not finite are dropped.
fn non_negative(amount: Option<f64>) -> Option<f64> {
    amount.filter(|value| value.is_finite() && *value >= 0.0)
}

/// Contents accepted from outside the store keep only usable amounts.
fn sanitize_contents(contents: ApparatusContents) -> ApparatusContents {
    ApparatusContents {
        volume_ml: non_negative(contents.volume_ml),
        mass_g: non_negative(contents.mass_g),
        ..contents
    }
}

/// Chemical record describing what an item currently holds, used as
/// predictor input after a pour. Only the label, state, volume and color
/// survive the trip through the bench.
pub fn chemical_from_contents(contents: &ApparatusContents) -> ParsedChemical {
    ParsedChemical {
        name: if contents.label.trim().is_empty() {
            crate::UNKNOWN_CHEMICAL.to_string()
        } else {
            contents.label.clone()
        },
        formula: None,
        state: contents.state.into(),
        form: None,
        concentration_m: None,
        volume_ml: contents.volume_ml,
        temperature_c: None,
        color: contents.color,
    }
}

fn clamp_to_bench(x: f64, current: f64, constants: &BenchConstants) -> f64 {
    let min = constants.drag_margin_left_px;
    let max = (constants.bench_width_px - constants.drag_margin_right_px).max(min);
    if x.is_finite() {
        x.clamp(min, max)
    } else {
        current.clamp(min, max)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
