//! Placeholder reaction prediction.
//!
//! Used when no completion service produces a usable answer. The gas and heat
//! fields are a weighted coin flip through the passed-in Rng, not a physical
//! model; only the color and products fields are deterministic.

use rand::Rng;

use crate::color::Rgb;
use crate::{HeatEffect, ParsedChemical, PredictedEffects, ReactionEffect, ReactionPrediction};

pub const MOCK_DEFAULT_COLOR: Rgb = Rgb::new(0x60, 0xa5, 0xfa);
pub const MOCK_PREDICTION_TEXT: &str =
    "Mock prediction: subtle color change observed; minimal heat.";

/// Chance that the placeholder reports gas.
const MOCK_GAS_PROBABILITY: f64 = 0.3;
/// Chance that the placeholder reports an exothermic mix.
const MOCK_EXOTHERMIC_PROBABILITY: f64 = 0.5;

pub fn mock_prediction(
    a: &ParsedChemical,
    b: Option<&ParsedChemical>,
    rng: &mut impl Rng,
) -> ReactionPrediction {
    let color = a
        .color
        .or_else(|| b.and_then(|other| other.color))
        .unwrap_or(MOCK_DEFAULT_COLOR);
    let gas = rng
        .gen_bool(MOCK_GAS_PROBABILITY)
        .then(|| "bubbles".to_string());
    let heat = if rng.gen_bool(MOCK_EXOTHERMIC_PROBABILITY) {
        HeatEffect::Exothermic
    } else {
        HeatEffect::Neutral
    };
    ReactionPrediction {
        effects: PredictedEffects {
            color: Some(color.to_string()),
            gas,
            heat: Some(heat),
            precipitate: None,
        },
        products: b.map(|other| {
            vec![format!("{} + {}", a.formula_or_name(), other.formula_or_name())]
        }),
        text: MOCK_PREDICTION_TEXT.to_string(),
    }
}

impl ReactionEffect {
    /// Effect summary recorded in the reaction history; the description is
    /// the prediction text.
    pub fn from_prediction(prediction: &ReactionPrediction) -> Self {
        Self {
            color_change: prediction.effects.color.clone(),
            gas: prediction.effects.gas.clone(),
            heat: prediction.effects.heat,
            precipitate: prediction.effects.precipitate.clone(),
            description: prediction.text.clone(),
        }
    }
}
