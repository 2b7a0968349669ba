use std::sync::atomic::{AtomicUsize, Ordering};

use lab_assist::{Assistant, CompletionService, ServiceError, Source};
use lab_core::test_fixtures::aqueous;
use lab_core::{ChemicalState, HeatEffect, ParsedChemical, ReactionPrediction, MOCK_PREDICTION_TEXT};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::{json, Map, Value};

/// Replies with the same canned result every time and counts calls.
struct Canned {
    reply: Result<String, ServiceError>,
    calls: AtomicUsize,
}

impl Canned {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    fn failing(err: ServiceError) -> Self {
        Self {
            reply: Err(err),
            calls: AtomicUsize::new(0),
        }
    }
}

impl CompletionService for Canned {
    async fn complete(&self, _prompt: &str) -> Result<String, ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}

fn assistant(service: Canned) -> Assistant<Canned, ChaCha8Rng> {
    Assistant::new(service, ChaCha8Rng::seed_from_u64(7))
}

#[tokio::test]
async fn service_reply_is_normalized() {
    let lab = assistant(Canned::replying(
        r#"{"name":"Copper sulfate","formula":"CuSO4","state":"aq","volumeMl":"25"}"#,
    ));
    let (chemical, source) = lab
        .interpreter
        .interpret_with_source("some copper sulfate")
        .await;
    assert_eq!(source, Source::Service);
    assert_eq!(chemical.formula.as_deref(), Some("CuSO4"));
    assert_eq!(chemical.state, ChemicalState::Aqueous);
    assert_eq!(chemical.volume_ml, Some(25.0));
    // No colorHex in the reply, so the name lookup supplies one.
    assert_eq!(
        chemical.color.map(|c| c.to_string()).as_deref(),
        Some("#2563eb")
    );
}

#[tokio::test]
async fn unavailable_service_uses_heuristics() {
    let lab = assistant(Canned::failing(ServiceError::Unavailable));
    let (chemical, source) = lab
        .interpreter
        .interpret_with_source("NaOH, 2M, aq, 30C")
        .await;
    assert_eq!(source, Source::Fallback);
    assert_eq!(chemical.name, "NaOH");
    assert_eq!(chemical.concentration_m, Some(2.0));
    assert_eq!(chemical.temperature_c, Some(30.0));
}

#[tokio::test]
async fn malformed_reply_uses_heuristics() {
    let lab = assistant(Canned::replying("Sorry, I can't do that."));
    let chemical = lab.interpreter.interpret("50 ml water").await;
    assert_eq!(chemical.name, "water");
    assert_eq!(chemical.volume_ml, Some(50.0));
}

#[tokio::test]
async fn failed_prediction_uses_mock() {
    for err in [
        ServiceError::Unavailable,
        ServiceError::Timeout,
        ServiceError::Http {
            status: 500,
            message: "boom".to_string(),
        },
    ] {
        let lab = assistant(Canned::failing(err));
        let a = aqueous("HCl", Some(1.0));
        let b = aqueous("NaOH", Some(1.0));
        let (prediction, source) = lab.predictor.predict_with_source(&a, Some(&b)).await;
        assert_eq!(source, Source::Fallback);
        assert_eq!(prediction.text, MOCK_PREDICTION_TEXT);
        assert_eq!(prediction.products, Some(vec!["HCl + NaOH".to_string()]));
    }
}

#[tokio::test]
async fn prediction_without_text_uses_mock() {
    let lab = assistant(Canned::replying(r#"{"effects":{"heat":"exothermic"}}"#));
    let prediction = lab.predictor.predict(&aqueous("HCl", None), None).await;
    assert_eq!(prediction.text, MOCK_PREDICTION_TEXT);
}

#[tokio::test]
async fn service_prediction_is_returned() {
    let lab = assistant(Canned::replying(
        "```json\n{\"effects\":{\"heat\":\"exothermic\",\"gas\":\"none\"},\"products\":[\"NaCl\",\"H2O\"],\"text\":\"Neutralisation; the beaker warms.\"}\n```",
    ));
    let a = aqueous("HCl", Some(1.0));
    let b = aqueous("NaOH", Some(1.0));
    let (prediction, source) = lab.predictor.predict_with_source(&a, Some(&b)).await;
    assert_eq!(source, Source::Service);
    assert_eq!(prediction.effects.heat, Some(HeatEffect::Exothermic));
    assert_eq!(prediction.text, "Neutralisation; the beaker warms.");
}

#[tokio::test]
async fn interpreter_and_predictor_share_one_service() {
    let lab = assistant(Canned::failing(ServiceError::Unavailable));
    lab.interpreter.interpret("water").await;
    lab.predictor.predict(&aqueous("water", None), None).await;
    assert_eq!(lab.service().calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Randomized replies
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Noise {
    /// Arbitrary printable text, sometimes with stray braces.
    Garbage,
    /// JSON objects with the expected keys holding values of the wrong type.
    WrongTypes,
}

/// Completion service that makes up a different bad reply on every call.
struct Noisy {
    noise: Noise,
    rng: Mutex<ChaCha8Rng>,
}

impl Noisy {
    fn new(noise: Noise, seed: u64) -> Self {
        Self {
            noise,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }
}

const CHEMICAL_KEYS: [&str; 8] = [
    "name",
    "formula",
    "state",
    "form",
    "concentrationM",
    "volumeMl",
    "temperatureC",
    "colorHex",
];

fn junk_value(rng: &mut ChaCha8Rng) -> Value {
    let pool = [
        json!(5),
        json!(-3.5),
        json!([]),
        json!({}),
        json!(null),
        json!(true),
        json!("NaN"),
        json!("inf"),
        json!("-12"),
        json!("   "),
        json!("12abc"),
        json!("#zzzzzz"),
        json!(["aq"]),
        json!({"text": 1}),
        json!("plasma"),
        json!("Copper sulfate"),
    ];
    pool.choose(rng).cloned().unwrap_or(Value::Null)
}

fn junk_object(rng: &mut ChaCha8Rng, keys: &[&str]) -> String {
    let mut object = Map::new();
    for key in keys {
        if rng.gen_bool(0.8) {
            object.insert((*key).to_string(), junk_value(rng));
        }
    }
    Value::Object(object).to_string()
}

fn garbage_text(rng: &mut ChaCha8Rng) -> String {
    let len = rng.gen_range(0..60);
    (0..len)
        .map(|_| {
            if rng.gen_bool(0.05) {
                *[' ', '{', '}', '"', ':'].choose(rng).unwrap_or(&' ')
            } else {
                char::from(rng.gen_range(0x20u8..0x7f))
            }
        })
        .collect()
}

impl CompletionService for Noisy {
    async fn complete(&self, prompt: &str) -> Result<String, ServiceError> {
        let mut rng = self.rng.lock();
        Ok(match self.noise {
            Noise::Garbage => garbage_text(&mut rng),
            Noise::WrongTypes if prompt.contains("reaction simulator") => {
                junk_object(&mut rng, &["effects", "products", "text"])
            }
            Noise::WrongTypes => junk_object(&mut rng, &CHEMICAL_KEYS),
        })
    }
}

fn random_description(rng: &mut ChaCha8Rng) -> String {
    let words = [
        "NaOH", "copper", "sulfate", "iron", "permanganate", "water", "aq", "(s)", "gas", ",",
        "HCl", "chromate", "solid", "°C", "M", "ml",
    ];
    let mut parts = Vec::new();
    for _ in 0..rng.gen_range(0..6) {
        match rng.gen_range(0..4) {
            0 => parts.push(format!("{:.1}ml", rng.gen_range(-50.0..500.0))),
            1 => parts.push(format!("{:.2}M", rng.gen_range(-2.0..6.0))),
            2 => parts.push(format!("{}C", rng.gen_range(-20..120))),
            _ => parts.push((*words.choose(rng).unwrap_or(&"water")).to_string()),
        }
    }
    parts.join(" ")
}

fn assert_well_formed_chemical(chemical: &ParsedChemical, input: &str) {
    assert!(!chemical.name.trim().is_empty(), "empty name for {input:?}");
    for amount in [chemical.volume_ml, chemical.concentration_m].into_iter().flatten() {
        assert!(
            amount.is_finite() && amount >= 0.0,
            "bad amount {amount} for {input:?}: {chemical:?}"
        );
    }
    if let Some(temperature) = chemical.temperature_c {
        assert!(temperature.is_finite(), "bad temperature for {input:?}");
    }
}

fn assert_well_formed_prediction(prediction: &ReactionPrediction) {
    assert!(!prediction.text.trim().is_empty(), "empty text: {prediction:?}");
}

async fn run_random_rounds<S: CompletionService>(lab: &Assistant<S, ChaCha8Rng>, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..200 {
        let input = random_description(&mut rng);
        let a = lab.interpreter.interpret(&input).await;
        assert_well_formed_chemical(&a, &input);

        let other = random_description(&mut rng);
        let b = lab.interpreter.interpret(&other).await;
        assert_well_formed_chemical(&b, &other);

        let second = rng.gen_bool(0.5).then_some(&b);
        let prediction = lab.predictor.predict(&a, second).await;
        assert_well_formed_prediction(&prediction);
    }
}

#[tokio::test]
async fn random_inputs_with_unavailable_service_stay_well_formed() {
    let lab = assistant(Canned::failing(ServiceError::Unavailable));
    run_random_rounds(&lab, 11).await;
}

#[tokio::test]
async fn random_garbage_replies_stay_well_formed() {
    let lab = Assistant::new(Noisy::new(Noise::Garbage, 21), ChaCha8Rng::seed_from_u64(3));
    run_random_rounds(&lab, 22).await;
}

#[tokio::test]
async fn wrong_typed_json_replies_stay_well_formed() {
    let lab = Assistant::new(Noisy::new(Noise::WrongTypes, 31), ChaCha8Rng::seed_from_u64(4));
    run_random_rounds(&lab, 32).await;
}

#[tokio::test]
async fn wrong_typed_fields_are_dropped_not_trusted() {
    let lab = assistant(Canned::replying(
        r#"{"name":5,"state":[],"volumeMl":"NaN","concentrationM":"-2","temperatureC":"inf"}"#,
    ));
    let (chemical, source) = lab.interpreter.interpret_with_source("mystery powder").await;
    assert_eq!(source, Source::Service);
    assert_eq!(chemical.name, "Unknown");
    assert_eq!(chemical.state, ChemicalState::Aqueous);
    assert_eq!(chemical.volume_ml, None);
    assert_eq!(chemical.concentration_m, None);
    assert_eq!(chemical.temperature_c, None);
}
