//! Completion-service backed interpretation and prediction.
//!
//! Both services always answer: a missing credential, a failed call or an
//! unusable reply falls back to the rule-based paths in `lab_core`.

mod client;

use std::sync::Arc;

use lab_core::{
    chemical_prompt, heuristic_parse, mock_prediction, normalize_chemical,
    parse_chemical_response, parse_prediction_response, prediction_prompt, ParsedChemical,
    ReactionPrediction,
};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

pub use client::{
    ChatCompletionClient, CompletionService, ServiceConfig, ServiceError, DEFAULT_ENDPOINT,
    DEFAULT_MODEL,
};

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Service,
    Fallback,
}

fn log_service_failure(err: &ServiceError, what: &str) {
    match err {
        ServiceError::Unavailable => debug!("{what}: completion service unavailable, falling back"),
        other => warn!(error = %other, "{what}: completion service failed, falling back"),
    }
}

/// Free text to [`ParsedChemical`].
pub struct Interpreter<S> {
    service: Arc<S>,
}

impl<S: CompletionService> Interpreter<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }

    pub async fn interpret(&self, input: &str) -> ParsedChemical {
        self.interpret_with_source(input).await.0
    }

    pub async fn interpret_with_source(&self, input: &str) -> (ParsedChemical, Source) {
        match self.service.complete(&chemical_prompt(input)).await {
            Ok(reply) => match parse_chemical_response(&reply) {
                Ok(draft) => return (normalize_chemical(draft), Source::Service),
                Err(err) => debug!(error = %err, "chemical reply unusable, using heuristic parse"),
            },
            Err(err) => log_service_failure(&err, "interpret"),
        }
        (heuristic_parse(input), Source::Fallback)
    }
}

/// One or two chemicals to a [`ReactionPrediction`].
///
/// The fallback draws from `rng`; it is only locked after the service call
/// has resolved.
pub struct Predictor<S, R> {
    service: Arc<S>,
    rng: Mutex<R>,
}

impl<S: CompletionService, R: Rng + Send> Predictor<S, R> {
    pub fn new(service: Arc<S>, rng: R) -> Self {
        Self {
            service,
            rng: Mutex::new(rng),
        }
    }

    pub async fn predict(&self, a: &ParsedChemical, b: Option<&ParsedChemical>) -> ReactionPrediction {
        self.predict_with_source(a, b).await.0
    }

    pub async fn predict_with_source(
        &self,
        a: &ParsedChemical,
        b: Option<&ParsedChemical>,
    ) -> (ReactionPrediction, Source) {
        match self.service.complete(&prediction_prompt(a, b)).await {
            Ok(reply) => match parse_prediction_response(&reply) {
                Ok(prediction) => return (prediction, Source::Service),
                Err(err) => debug!(error = %err, "prediction reply unusable, using mock"),
            },
            Err(err) => log_service_failure(&err, "predict"),
        }
        let prediction = mock_prediction(a, b, &mut *self.rng.lock());
        (prediction, Source::Fallback)
    }
}

/// Interpreter and Predictor sharing one service.
pub struct Assistant<S, R> {
    pub interpreter: Interpreter<S>,
    pub predictor: Predictor<S, R>,
}

impl<S: CompletionService, R: Rng + Send> Assistant<S, R> {
    pub fn new(service: S, rng: R) -> Self {
        let service = Arc::new(service);
        Self {
            interpreter: Interpreter::new(Arc::clone(&service)),
            predictor: Predictor::new(service, rng),
        }
    }

    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.interpreter.service)
    }
}
