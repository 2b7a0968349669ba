use rand::Rng;
use uuid::Uuid;

use crate::{ApparatusId, MeasurementId, ReactionId};

/// Generate a deterministic v4-format UUID from a seeded RNG.
pub fn generate_uuid(rng: &mut impl Rng) -> Uuid {
    let bytes: [u8; 16] = rng.gen();
    uuid::Builder::from_random_bytes(bytes).into_uuid()
}

pub(crate) fn new_apparatus_id(rng: &mut impl Rng) -> ApparatusId {
    ApparatusId(generate_uuid(rng).to_string())
}

pub(crate) fn new_measurement_id(rng: &mut impl Rng) -> MeasurementId {
    MeasurementId(generate_uuid(rng).to_string())
}

pub(crate) fn new_reaction_id(rng: &mut impl Rng) -> ReactionId {
    ReactionId(generate_uuid(rng).to_string())
}

/// Spreadsheet-style sequence letter for a zero-based index: A..Z, AA, AB, ...
pub fn sequence_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index;
    loop {
        let offset = u8::try_from(remaining % 26).unwrap_or_default();
        letters.push(char::from(b'A' + offset));
        if remaining < 26 {
            break;
        }
        remaining = remaining / 26 - 1;
    }
    letters.iter().rev().collect()
}
