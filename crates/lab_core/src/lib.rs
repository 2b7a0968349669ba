//! Workbench state model for the virtual chemistry lab.
//!
//! No IO, no network. All randomness via the passed-in Rng.

pub mod color;
mod engine;
mod id;
mod interpret;
mod predict;
mod prompt;
mod stockroom;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;
mod types;

pub use color::{blend, blend_hex, ColorParseError, Rgb};
pub use engine::apply_command;
pub use id::{generate_uuid, sequence_letter};
pub use interpret::{
    guess_color, heuristic_parse, normalize_chemical, ChemicalDraft, UNKNOWN_CHEMICAL,
};
pub use predict::{mock_prediction, MOCK_DEFAULT_COLOR, MOCK_PREDICTION_TEXT};
pub use prompt::{
    chemical_prompt, parse_chemical_response, parse_prediction_response, prediction_prompt,
    ParseFailure,
};
pub use stockroom::{
    DragPayload, DropAction, DropError, GlasswareItem, SolutionItem, Stockroom, ToolItem,
};
pub use store::{chemical_from_contents, contents_from_chemical, StoreError};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, timestamp: TimestampMs, event: LabEvent) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope {
        id,
        timestamp,
        event,
    }
}
