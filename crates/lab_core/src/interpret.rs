//! Heuristic chemical interpretation.
//!
//! Turns free text such as `"NaOH, 2M, aq, 30C"` into a [`ParsedChemical`]
//! without any external help, and normalizes loosely-typed drafts (from a
//! completion service) with the same defaulting rules.

use std::sync::LazyLock;

use regex::Regex;

use crate::color::Rgb;
use crate::{ChemicalState, ParsedChemical};

pub const UNKNOWN_CHEMICAL: &str = "Unknown";

static VOLUME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*ml\b").expect("volume pattern"));
// `m` must end the token so that "30 ml" is not read as a molarity.
static CONCENTRATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*m\b").expect("concentration pattern"));
static TEMPERATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(-?\d+(?:\.\d+)?)\s*°?\s*c\b").expect("temperature pattern")
});
static AQUEOUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(aq\)|\b(?:aqueous|aq)\b").expect("aqueous pattern"));
static SOLID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(s\)|\bsolid\b").expect("solid pattern"));
static GAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\(g\)|\b(?:gas|gaseous)\b").expect("gas pattern"));

/// Substring lookup, case-insensitive. Illustrative only.
const NAME_COLORS: &[(&str, Rgb)] = &[
    ("copper", Rgb::new(0x25, 0x63, 0xeb)),
    ("iron", Rgb::new(0xb4, 0x53, 0x09)),
    ("permanganate", Rgb::new(0x7c, 0x3a, 0xed)),
    ("chromate", Rgb::new(0xfb, 0xbf, 0x24)),
];

pub fn guess_color(name: &str) -> Option<Rgb> {
    let lower = name.to_lowercase();
    NAME_COLORS
        .iter()
        .find(|(needle, _)| lower.contains(needle))
        .map(|(_, color)| *color)
}

/// Loosely-typed chemical fields as they arrive from outside. Numbers are
/// already coerced; everything else is unvalidated text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChemicalDraft {
    pub name: Option<String>,
    pub formula: Option<String>,
    pub state: Option<String>,
    pub form: Option<String>,
    pub concentration_m: Option<f64>,
    pub volume_ml: Option<f64>,
    pub temperature_c: Option<f64>,
    pub color_hex: Option<String>,
}

/// Applies the shared defaulting rules: missing name is `Unknown`, missing or
/// unrecognised state is aqueous, non-finite numbers and negative amounts are
/// dropped, an invalid color falls back to the name lookup.
pub fn normalize_chemical(draft: ChemicalDraft) -> ParsedChemical {
    let name = non_empty(draft.name).unwrap_or_else(|| UNKNOWN_CHEMICAL.to_string());
    let state = draft
        .state
        .as_deref()
        .and_then(ChemicalState::parse)
        .unwrap_or(ChemicalState::Aqueous);
    let color = draft
        .color_hex
        .as_deref()
        .and_then(|hex| hex.parse::<Rgb>().ok())
        .or_else(|| guess_color(&name));
    ParsedChemical {
        formula: non_empty(draft.formula),
        form: non_empty(draft.form),
        concentration_m: non_negative(draft.concentration_m),
        volume_ml: non_negative(draft.volume_ml),
        temperature_c: finite(draft.temperature_c),
        state,
        color,
        name,
    }
}

/// Rule-based parse used whenever no completion service answers. Never fails.
pub fn heuristic_parse(input: &str) -> ParsedChemical {
    let volume_ml = first_number(&VOLUME, input);
    let concentration_m = first_number(&CONCENTRATION, input);
    let temperature_c = first_number(&TEMPERATURE, input);

    let state = if AQUEOUS.is_match(input) {
        ChemicalState::Aqueous
    } else if SOLID.is_match(input) {
        ChemicalState::Solid
    } else if GAS.is_match(input) {
        ChemicalState::Gas
    } else {
        ChemicalState::Liquid
    };

    let name = residual_name(input);
    let color = guess_color(&name);
    ParsedChemical {
        name: if name.is_empty() {
            UNKNOWN_CHEMICAL.to_string()
        } else {
            name
        },
        formula: None,
        state,
        form: None,
        concentration_m: non_negative(concentration_m),
        volume_ml: non_negative(volume_ml),
        temperature_c,
        color,
    }
}

/// Input with every recognised quantity and state keyword removed, comma
/// separated fragments tidied.
fn residual_name(input: &str) -> String {
    let mut rest = input.to_string();
    for pattern in [&*VOLUME, &*CONCENTRATION, &*TEMPERATURE, &*AQUEOUS, &*SOLID, &*GAS] {
        rest = pattern.replace_all(&rest, "").into_owned();
    }
    rest.split(',')
        .map(|fragment| fragment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|fragment| !fragment.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn first_number(pattern: &Regex, input: &str) -> Option<f64> {
    pattern
        .captures(input)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn non_negative(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v >= 0.0)
}

impl ParsedChemical {
    pub fn formula_or_name(&self) -> &str {
        self.formula.as_deref().unwrap_or(&self.name)
    }

    /// One-line description used in prompts:
    /// `"Name (Formula), state, 2M, 30ml, 25°C"`.
    pub fn summary(&self) -> String {
        let mut text = self.name.clone();
        if let Some(formula) = &self.formula {
            text.push_str(&format!(" ({formula})"));
        }
        text.push_str(&format!(", {}", self.state.name()));
        if let Some(concentration) = self.concentration_m.filter(|c| *c != 0.0) {
            text.push_str(&format!(", {concentration}M"));
        }
        if let Some(volume) = self.volume_ml.filter(|v| *v != 0.0) {
            text.push_str(&format!(", {volume}ml"));
        }
        if let Some(temperature) = self.temperature_c.filter(|t| *t != 0.0) {
            text.push_str(&format!(", {temperature}°C"));
        }
        text
    }
}
