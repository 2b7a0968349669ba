//! Type definitions for `lab_core`.
//!
//! Workbench state, chemical records, predictions, commands and events.

use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Milliseconds since the Unix epoch, supplied by the caller.
pub type TimestampMs = u64;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_id!(ApparatusId);
string_id!(MeasurementId);
string_id!(ReactionId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Apparatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApparatusKind {
    Beaker,
    #[serde(rename = "Conical Flask")]
    ConicalFlask,
    #[serde(rename = "Test Tube")]
    TestTube,
    #[serde(rename = "Boiling Tube")]
    BoilingTube,
    Pipette,
    #[serde(rename = "Volumetric Flask")]
    VolumetricFlask,
    #[serde(rename = "Measuring Cylinder")]
    MeasuringCylinder,
    Burette,
    #[serde(rename = "Watch Glass")]
    WatchGlass,
    Crucible,
    Funnel,
    Condenser,
    #[serde(rename = "Stirring Rod")]
    StirringRod,
    #[serde(rename = "Tripod Stand")]
    TripodStand,
    #[serde(rename = "Wire Gauze")]
    WireGauze,
    #[serde(rename = "Clamp Stand")]
    ClampStand,
    #[serde(rename = "Bunsen Burner")]
    BunsenBurner,
    #[serde(rename = "White Tile")]
    WhiteTile,
    Centrifuge,
    #[serde(rename = "Evaporating Dish")]
    EvaporatingDish,
}

impl ApparatusKind {
    pub const ALL: [ApparatusKind; 20] = [
        Self::Beaker,
        Self::ConicalFlask,
        Self::TestTube,
        Self::BoilingTube,
        Self::Pipette,
        Self::VolumetricFlask,
        Self::MeasuringCylinder,
        Self::Burette,
        Self::WatchGlass,
        Self::Crucible,
        Self::Funnel,
        Self::Condenser,
        Self::StirringRod,
        Self::TripodStand,
        Self::WireGauze,
        Self::ClampStand,
        Self::BunsenBurner,
        Self::WhiteTile,
        Self::Centrifuge,
        Self::EvaporatingDish,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Beaker => "Beaker",
            Self::ConicalFlask => "Conical Flask",
            Self::TestTube => "Test Tube",
            Self::BoilingTube => "Boiling Tube",
            Self::Pipette => "Pipette",
            Self::VolumetricFlask => "Volumetric Flask",
            Self::MeasuringCylinder => "Measuring Cylinder",
            Self::Burette => "Burette",
            Self::WatchGlass => "Watch Glass",
            Self::Crucible => "Crucible",
            Self::Funnel => "Funnel",
            Self::Condenser => "Condenser",
            Self::StirringRod => "Stirring Rod",
            Self::TripodStand => "Tripod Stand",
            Self::WireGauze => "Wire Gauze",
            Self::ClampStand => "Clamp Stand",
            Self::BunsenBurner => "Bunsen Burner",
            Self::WhiteTile => "White Tile",
            Self::Centrifuge => "Centrifuge",
            Self::EvaporatingDish => "Evaporating Dish",
        }
    }
}

impl std::fmt::Display for ApparatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    /// Fixed at the bench baseline in the simple layout.
    pub y: f64,
}

/// Physical state of material held in an apparatus. Aqueous solutions are
/// stored as `Liquid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatterState {
    Solid,
    Liquid,
    Gas,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApparatusContents {
    pub label: String,
    pub color: Option<Rgb>,
    /// Never negative.
    pub volume_ml: Option<f64>,
    pub mass_g: Option<f64>,
    pub state: MatterState,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApparatusItem {
    /// Unique and stable once assigned.
    pub id: ApparatusId,
    pub kind: ApparatusKind,
    pub capacity_ml: Option<f64>,
    pub label: String,
    pub position: Position,
    pub contents: Option<ApparatusContents>,
}

/// Fields a caller may supply to `add_apparatus` in place of the generated
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApparatusOverrides {
    pub id: Option<ApparatusId>,
    pub label: Option<String>,
    pub position: Option<Position>,
    pub contents: Option<ApparatusContents>,
}

/// Partial update merged into an existing item by `update_apparatus`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApparatusPatch {
    pub kind: Option<ApparatusKind>,
    pub capacity_ml: Option<f64>,
    pub label: Option<String>,
    pub position: Option<Position>,
    pub contents: Option<ApparatusContents>,
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAction {
    pub from_apparatus_id: ApparatusId,
    pub to_apparatus_id: ApparatusId,
    /// Amount actually moved, after clamping to the source volume.
    pub volume_ml: f64,
    pub timestamp: TimestampMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementKind {
    #[serde(rename = "pH")]
    Ph,
    Temperature,
    Conductivity,
}

impl MeasurementKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Ph => "pH",
            Self::Temperature => "Temperature",
            Self::Conductivity => "Conductivity",
        }
    }
}

impl std::fmt::Display for MeasurementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementEntry {
    pub id: MeasurementId,
    /// Not validated against the apparatus list; quick readings use `-`.
    pub apparatus_id: ApparatusId,
    pub kind: MeasurementKind,
    pub value: f64,
    pub timestamp: TimestampMs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeatEffect {
    Endothermic,
    Exothermic,
    Neutral,
}

impl HeatEffect {
    /// Case-insensitive parse; anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "endothermic" => Some(Self::Endothermic),
            "exothermic" => Some(Self::Exothermic),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEffect {
    pub color_change: Option<String>,
    pub gas: Option<String>,
    pub heat: Option<HeatEffect>,
    pub precipitate: Option<String>,
    pub description: String,
}

/// Input to `record_reaction`; the store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReaction {
    pub a: Option<ParsedChemical>,
    pub b: Option<ParsedChemical>,
    pub effect: ReactionEffect,
    pub prediction: Option<ReactionPrediction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub id: ReactionId,
    pub a: Option<ParsedChemical>,
    pub b: Option<ParsedChemical>,
    pub effect: ReactionEffect,
    pub prediction: Option<ReactionPrediction>,
    pub timestamp: TimestampMs,
}

// ---------------------------------------------------------------------------
// Chemicals and predictions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChemicalState {
    Solid,
    Liquid,
    Gas,
    Aqueous,
}

impl ChemicalState {
    pub fn name(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Liquid => "liquid",
            Self::Gas => "gas",
            Self::Aqueous => "aqueous",
        }
    }

    /// Case-insensitive parse of the four state names and their `(s)`/`(aq)`
    /// style abbreviations.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim().trim_start_matches('(').trim_end_matches(')');
        match trimmed.to_ascii_lowercase().as_str() {
            "solid" | "s" => Some(Self::Solid),
            "liquid" | "l" => Some(Self::Liquid),
            "gas" | "g" => Some(Self::Gas),
            "aqueous" | "aq" => Some(Self::Aqueous),
            _ => None,
        }
    }

    /// Contents only ever hold solid, liquid or gas.
    pub fn as_matter(self) -> MatterState {
        match self {
            Self::Solid => MatterState::Solid,
            Self::Gas => MatterState::Gas,
            Self::Liquid | Self::Aqueous => MatterState::Liquid,
        }
    }
}

impl From<MatterState> for ChemicalState {
    fn from(state: MatterState) -> Self {
        match state {
            MatterState::Solid => Self::Solid,
            MatterState::Liquid => Self::Liquid,
            MatterState::Gas => Self::Gas,
        }
    }
}

/// Structured chemical record. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedChemical {
    pub name: String,
    pub formula: Option<String>,
    pub state: ChemicalState,
    pub form: Option<String>,
    pub concentration_m: Option<f64>,
    pub volume_ml: Option<f64>,
    pub temperature_c: Option<f64>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictedEffects {
    pub color: Option<String>,
    pub gas: Option<String>,
    pub heat: Option<HeatEffect>,
    pub precipitate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPrediction {
    pub effects: PredictedEffects,
    pub products: Option<Vec<String>>,
    pub text: String,
}

// ---------------------------------------------------------------------------
// Workspace state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
}

/// The whole workbench. Owns every apparatus item and all three logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabState {
    pub apparatus: Vec<ApparatusItem>,
    pub transfers: Vec<TransferAction>,
    pub measurements: Vec<MeasurementEntry>,
    pub reaction_history: Vec<ReactionRecord>,
    pub zoom: f64,
    pub tutor_enabled: bool,
    pub counters: Counters,
}

impl Default for LabState {
    fn default() -> Self {
        Self {
            apparatus: Vec::new(),
            transfers: Vec::new(),
            measurements: Vec::new(),
            reaction_history: Vec::new(),
            zoom: 1.0,
            tutor_enabled: false,
            counters: Counters { next_event_id: 0 },
        }
    }
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// Bench geometry and pour behaviour, loaded from `constants.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConstants {
    pub bench_width_px: f64,
    pub drag_margin_left_px: f64,
    /// x never exceeds `bench_width_px - drag_margin_right_px`.
    pub drag_margin_right_px: f64,
    pub shelf_start_x_px: f64,
    pub shelf_step_px: f64,
    pub baseline_y_px: f64,
    pub pour_proximity_px: f64,
    pub pour_volume_ml: f64,
}

impl Default for BenchConstants {
    fn default() -> Self {
        Self {
            bench_width_px: 1200.0,
            drag_margin_left_px: 20.0,
            drag_margin_right_px: 120.0,
            shelf_start_x_px: 100.0,
            shelf_step_px: 80.0,
            baseline_y_px: 300.0,
            pour_proximity_px: 40.0,
            pour_volume_ml: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabContent {
    pub content_version: String,
    pub constants: BenchConstants,
    pub stockroom: crate::Stockroom,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LabCommand {
    AddApparatus {
        kind: ApparatusKind,
        capacity_ml: Option<f64>,
        #[serde(default)]
        overrides: ApparatusOverrides,
    },
    UpdateApparatus {
        id: ApparatusId,
        patch: ApparatusPatch,
    },
    MoveApparatus {
        id: ApparatusId,
        x: f64,
    },
    RemoveApparatus {
        id: ApparatusId,
    },
    AddChemical {
        id: ApparatusId,
        chemical: Box<ParsedChemical>,
    },
    Transfer {
        from: ApparatusId,
        to: ApparatusId,
        volume_ml: f64,
    },
    LogMeasurement {
        apparatus_id: ApparatusId,
        kind: MeasurementKind,
        value: f64,
    },
    RecordReaction {
        reaction: Box<NewReaction>,
    },
    ClearWorkspace,
    SetZoom {
        zoom: f64,
    },
    SetTutorEnabled {
        enabled: bool,
    },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub timestamp: TimestampMs,
    pub event: LabEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LabEvent {
    ApparatusAdded {
        apparatus_id: ApparatusId,
        label: String,
    },
    ApparatusUpdated {
        apparatus_id: ApparatusId,
    },
    ApparatusMoved {
        apparatus_id: ApparatusId,
        x: f64,
    },
    ApparatusRemoved {
        apparatus_id: ApparatusId,
    },
    ChemicalAdded {
        apparatus_id: ApparatusId,
        label: String,
    },
    Transferred(TransferAction),
    MeasurementLogged {
        measurement_id: MeasurementId,
        apparatus_id: ApparatusId,
        kind: MeasurementKind,
        value: f64,
    },
    ReactionRecorded {
        reaction_id: ReactionId,
        description: String,
    },
    WorkspaceCleared,
    ZoomChanged {
        zoom: f64,
    },
    TutorToggled {
        enabled: bool,
    },
    /// A command targeted something that no longer exists; state is unchanged.
    CommandIgnored {
        reason: String,
    },
}
