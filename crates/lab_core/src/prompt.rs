//! Prompts for the completion service and parsing of its replies.
//!
//! Replies are untrusted text. Anything that does not hold the expected
//! record is a [`ParseFailure`]; callers fall back instead of surfacing it.

use serde_json::{Map, Value};

use crate::interpret::ChemicalDraft;
use crate::{HeatEffect, ParsedChemical, PredictedEffects, ReactionPrediction};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No JSON document could be found in the reply.
    NotJson(String),
    /// The document is JSON but not an object.
    NotAnObject,
    /// A prediction without its description text.
    MissingText,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseFailure::NotJson(msg) => write!(f, "reply is not JSON: {msg}"),
            ParseFailure::NotAnObject => write!(f, "reply is not a JSON object"),
            ParseFailure::MissingText => write!(f, "prediction has no text"),
        }
    }
}

impl std::error::Error for ParseFailure {}

pub fn chemical_prompt(input: &str) -> String {
    format!(
        "You are a chemical parser. Extract these fields from the input: name, \
         formula (if easy), state (solid|liquid|gas|aqueous), form (optional), \
         concentrationM (number), volumeMl (number), temperatureC (number), \
         colorHex (approximate #rrggbb).\n\
         Input: {input}\n\
         Reply with a single JSON object and nothing else."
    )
}

pub fn prediction_prompt(a: &ParsedChemical, b: Option<&ParsedChemical>) -> String {
    let second = b.map_or_else(|| "(none)".to_string(), ParsedChemical::summary);
    format!(
        "You are a chemical reaction simulator. Given these inputs:\n\
         Chemical A: {}\n\
         Chemical B: {second}\n\
         Predict what happens when they are mixed. Cover color, temperature \
         change, gas and precipitate, with a short text description.\n\
         Reply with a single JSON object shaped like \
         {{\"effects\":{{\"color\":\"#rrggbb\",\"gas\":null,\"heat\":\"exothermic|endothermic|neutral\",\"precipitate\":null}},\
         \"products\":[\"...\"],\"text\":\"...\"}}.",
        a.summary()
    )
}

/// Reads the structured-extraction reply. Numbers may arrive as JSON numbers
/// or numeric strings; unreadable fields are left unset.
pub fn parse_chemical_response(raw: &str) -> Result<ChemicalDraft, ParseFailure> {
    let object = json_object(raw)?;
    Ok(ChemicalDraft {
        name: text_field(&object, &["name"]),
        formula: text_field(&object, &["formula"]),
        state: text_field(&object, &["state"]),
        form: text_field(&object, &["form"]),
        concentration_m: number_field(&object, &["concentrationM", "concentration_m"]),
        volume_ml: number_field(&object, &["volumeMl", "volume_ml"]),
        temperature_c: number_field(&object, &["temperatureC", "temperature_c"]),
        color_hex: text_field(&object, &["colorHex", "color_hex", "color"]),
    })
}

/// Reads the structured-prediction reply. `text` is required; every effect
/// is optional and an unrecognised heat value is dropped.
pub fn parse_prediction_response(raw: &str) -> Result<ReactionPrediction, ParseFailure> {
    let object = json_object(raw)?;
    let text = text_field(&object, &["text"]).ok_or(ParseFailure::MissingText)?;
    let effects = match object.get("effects") {
        Some(Value::Object(effects)) => PredictedEffects {
            color: text_field(effects, &["color"]),
            gas: text_field(effects, &["gas"]),
            heat: text_field(effects, &["heat"]).and_then(|heat| HeatEffect::parse(&heat)),
            precipitate: text_field(effects, &["precipitate"]),
        },
        _ => PredictedEffects::default(),
    };
    let products = match object.get("products") {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        Some(Value::String(single)) if !single.trim().is_empty() => {
            Some(vec![single.trim().to_string()])
        }
        _ => None,
    };
    Ok(ReactionPrediction {
        effects,
        products,
        text,
    })
}

/// Parses the reply as JSON, or failing that the span from the first `{` to
/// the last `}` (models like to wrap JSON in markdown fences).
fn json_object(raw: &str) -> Result<Map<String, Value>, ParseFailure> {
    let value = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value,
        Err(err) => {
            let span = raw
                .find('{')
                .zip(raw.rfind('}'))
                .filter(|(start, end)| start < end)
                .map(|(start, end)| &raw[start..=end])
                .ok_or_else(|| ParseFailure::NotJson(err.to_string()))?;
            serde_json::from_str(span).map_err(|e| ParseFailure::NotJson(e.to_string()))?
        }
    };
    match value {
        Value::Object(object) => Ok(object),
        _ => Err(ParseFailure::NotAnObject),
    }
}

fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
}

fn number_field(object: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find_map(|value| match value {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|number| number.is_finite())
}
