use crate::orchestrator::{self, AddOutcome, CombineOutcome, DropFailure, DropOutcome};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        Json,
    },
    routing::{get, post},
    Router,
};
use lab_assist::CompletionService;
use lab_core::{
    ApparatusId, DragPayload, DropError, EventEnvelope, LabCommand, ParsedChemical, Stockroom,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn make_router<S: CompletionService + 'static>(
    state: AppState<S>,
    cors_origin: HeaderValue,
) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler::<S>))
        .route("/api/v1/snapshot", get(snapshot_handler::<S>))
        .route("/api/v1/stockroom", get(stockroom_handler::<S>))
        .route("/api/v1/commands", post(commands_handler::<S>))
        .route("/api/v1/drop", post(drop_handler::<S>))
        .route("/api/v1/move", post(move_handler::<S>))
        .route("/api/v1/combine", post(combine_handler::<S>))
        .route("/api/v1/chemicals/parse", post(parse_handler::<S>))
        .route("/api/v1/chemicals/add", post(add_chemical_handler::<S>))
        .route("/api/v1/save", post(save_handler::<S>))
        .route("/api/v1/measurements.csv", get(measurements_csv_handler::<S>))
        .route("/api/v1/stream", get(stream_handler::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (
        status,
        Json(serde_json::json!({ "error": message.to_string() })),
    )
}

pub async fn meta_handler<S>(State(app_state): State<AppState<S>>) -> Json<serde_json::Value> {
    let lab = app_state.lab.lock();
    Json(serde_json::json!({
        "content_version": app_state.content.content_version,
        "apparatus_count": lab.state.apparatus.len(),
        "zoom": lab.state.zoom,
        "tutor_enabled": lab.state.tutor_enabled,
        "pour_volume_ml": app_state.content.constants.pour_volume_ml,
    }))
}

pub async fn snapshot_handler<S>(
    State(app_state): State<AppState<S>>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let lab = app_state.lab.lock();
    match serde_json::to_string(&lab.state) {
        Ok(json) => {
            drop(lab);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(lab);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn stockroom_handler<S>(State(app_state): State<AppState<S>>) -> Json<Stockroom> {
    Json(app_state.content.stockroom.clone())
}

pub async fn commands_handler<S>(
    State(app_state): State<AppState<S>>,
    Json(command): Json<LabCommand>,
) -> Json<Vec<EventEnvelope>> {
    Json(orchestrator::run_command(&app_state, command))
}

#[derive(Deserialize)]
pub struct DropRequest {
    pub payload: DragPayload,
    pub x: Option<f64>,
    pub target: Option<ApparatusId>,
}

pub async fn drop_handler<S: CompletionService>(
    State(app_state): State<AppState<S>>,
    Json(request): Json<DropRequest>,
) -> Result<Json<DropOutcome>, ApiError> {
    orchestrator::drop_item(&app_state, &request.payload, request.x, request.target)
        .await
        .map(Json)
        .map_err(|err| {
            let status = match err {
                DropFailure::Stockroom(DropError::UnknownItem(_)) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_REQUEST,
            };
            api_error(status, err)
        })
}

#[derive(Deserialize)]
pub struct MoveRequest {
    pub id: ApparatusId,
    pub x: f64,
}

pub async fn move_handler<S: CompletionService>(
    State(app_state): State<AppState<S>>,
    Json(request): Json<MoveRequest>,
) -> Json<CombineOutcome> {
    Json(orchestrator::move_and_pour(&app_state, request.id, request.x).await)
}

#[derive(Deserialize)]
pub struct CombineRequest {
    pub from: ApparatusId,
    pub to: ApparatusId,
}

pub async fn combine_handler<S: CompletionService>(
    State(app_state): State<AppState<S>>,
    Json(request): Json<CombineRequest>,
) -> Json<CombineOutcome> {
    Json(orchestrator::combine(&app_state, request.from, request.to).await)
}

#[derive(Deserialize)]
pub struct ParseRequest {
    pub text: String,
}

pub async fn parse_handler<S: CompletionService>(
    State(app_state): State<AppState<S>>,
    Json(request): Json<ParseRequest>,
) -> Json<ParsedChemical> {
    Json(app_state.assistant.interpreter.interpret(&request.text).await)
}

#[derive(Deserialize)]
pub struct AddChemicalRequest {
    pub id: ApparatusId,
    pub text: String,
}

pub async fn add_chemical_handler<S: CompletionService>(
    State(app_state): State<AppState<S>>,
    Json(request): Json<AddChemicalRequest>,
) -> Json<AddOutcome> {
    Json(orchestrator::parse_and_add(&app_state, request.id, &request.text).await)
}

pub async fn save_handler<S>(
    State(app_state): State<AppState<S>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let state = app_state.lab.lock().state.clone();
    match app_state.snapshots.save(&state) {
        Ok(path) => {
            tracing::info!(path = %path.display(), "workspace saved");
            Ok(Json(serde_json::json!({
                "path": path.display().to_string(),
                "apparatus_count": state.apparatus.len(),
            })))
        }
        Err(err) => {
            tracing::error!("save failed: {err:#}");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}")))
        }
    }
}

pub async fn measurements_csv_handler<S>(
    State(app_state): State<AppState<S>>,
) -> Result<([(header::HeaderName, &'static str); 1], String), ApiError> {
    let measurements = app_state.lab.lock().state.measurements.clone();
    lab_world::measurements_csv(&measurements)
        .map(|csv| ([(header::CONTENT_TYPE, "text/csv")], csv))
        .map_err(|err| {
            tracing::error!("measurement export failed: {err:#}");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "export failed")
        })
}

pub async fn stream_handler<S: Send + Sync + 'static>(
    State(app_state): State<AppState<S>>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.event_tx.subscribe();
    let lab = app_state.lab.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        let mut flush = tokio::time::interval(Duration::from_millis(50));
        flush.tick().await; // discard the immediate first tick
        let mut pending: Vec<EventEnvelope> = Vec::new();
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(events) => pending.extend(events),
                        Err(broadcast::error::RecvError::Lagged(_)) => {}
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = flush.tick() => {
                    if !pending.is_empty() {
                        let data = serde_json::to_string(&pending).unwrap_or_default();
                        pending.clear();
                        yield Ok(Event::default().data(data));
                    }
                }
                _ = heartbeat.tick() => {
                    let count = lab.lock().state.apparatus.len();
                    let hb = serde_json::json!({"heartbeat": true, "apparatus_count": count});
                    yield Ok(Event::default().data(hb.to_string()));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}
