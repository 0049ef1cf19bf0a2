use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use intel_core::{PlayerCommand, SourceId, TimeSpeed};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[cfg(test)]
pub fn make_router(state: AppState) -> Router {
    make_router_with_cors(state, HeaderValue::from_static("http://localhost:5173"))
}

pub fn make_router_with_cors(state: AppState, cors_origin: HeaderValue) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/meta", get(meta_handler))
        .route("/api/v1/snapshot", get(snapshot_handler))
        .route("/api/v1/projections", get(projections_handler))
        .route("/api/v1/alerts/pending", get(pending_alert_handler))
        .route("/api/v1/stream", get(stream_handler))
        .route("/api/v1/commands", post(command_handler))
        .route("/api/v1/sources/:id/toggle", post(toggle_source_handler))
        .route("/api/v1/views/:view", post(view_handler))
        .route("/api/v1/time-speed", post(time_speed_handler))
        .route("/api/v1/save", post(save_handler))
        .route(
            "/api/v1/tutorial",
            get(tutorial_handler).post(set_tutorial_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub async fn meta_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let session = app_state.session.lock();
    let state = session.state();
    Json(serde_json::json!({
        "content_version": session.catalog().content_version,
        "time_speed": state.time_speed.get(),
        "elapsed_minutes": state.elapsed.minutes,
        "session_minutes": session.session_minutes(),
        "score": state.score,
        "entities": state.entities.len(),
        "enabled_sources": session.enabled_source_count(),
        "tick_ms": app_state.tick_ms,
    }))
}

pub async fn snapshot_handler(
    State(app_state): State<AppState>,
) -> (StatusCode, [(header::HeaderName, &'static str); 1], String) {
    let session = app_state.session.lock();
    match serde_json::to_string(session.state()) {
        Ok(json) => {
            drop(session);
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                json,
            )
        }
        Err(err) => {
            tracing::error!("snapshot serialization failed: {err}");
            drop(session);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                r#"{"error":"serialization failed"}"#.to_string(),
            )
        }
    }
}

pub async fn projections_handler(State(app_state): State<AppState>) -> Response {
    let projections = app_state.session.lock().projections();
    Json(projections).into_response()
}

/// The alert to surface, or `null` when nothing is pending.
pub async fn pending_alert_handler(State(app_state): State<AppState>) -> Response {
    let alert = app_state.session.lock().pending_alert().cloned();
    Json(alert).into_response()
}

// ---------------------------------------------------------------------------
// Player input
// ---------------------------------------------------------------------------

/// Accepted commands answer with what was spent and logged. Commands the
/// player cannot afford are a conflict; anything else is unprocessable.
pub async fn command_handler(
    State(app_state): State<AppState>,
    Json(command): Json<PlayerCommand>,
) -> Response {
    let now_ms = app_state.now_ms();
    let result = app_state.session.lock().apply(&command, now_ms);
    match result {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(rejection) => {
            let status = if rejection.is_cost() {
                StatusCode::CONFLICT
            } else {
                StatusCode::UNPROCESSABLE_ENTITY
            };
            tracing::debug!(?command, %rejection, "command rejected");
            error_body(status, rejection.to_string())
        }
    }
}

pub async fn toggle_source_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let source_id = SourceId::new(id);
    let enabled = app_state.session.lock().toggle_source(&source_id);
    match enabled {
        Some(enabled) => {
            Json(serde_json::json!({ "id": source_id, "enabled": enabled })).into_response()
        }
        None => error_body(StatusCode::NOT_FOUND, format!("unknown source {source_id}")),
    }
}

pub async fn view_handler(State(app_state): State<AppState>, Path(view): Path<String>) -> Response {
    if app_state.session.lock().visit_view(&view) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_body(StatusCode::NOT_FOUND, format!("unknown view {view}"))
    }
}

#[derive(Deserialize)]
pub struct TimeSpeedRequest {
    speed: u32,
}

pub async fn time_speed_handler(
    State(app_state): State<AppState>,
    Json(request): Json<TimeSpeedRequest>,
) -> Response {
    let speed = match TimeSpeed::try_from(request.speed) {
        Ok(speed) => speed,
        Err(err) => return error_body(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    };
    let now_ms = app_state.now_ms();
    let mut session = app_state.session.lock();
    session.set_time_speed(speed, now_ms);
    let elapsed_minutes = session.state().elapsed.minutes;
    drop(session);
    tracing::info!(speed = speed.get(), "time speed changed");
    Json(serde_json::json!({ "speed": speed, "elapsed_minutes": elapsed_minutes }))
        .into_response()
}

pub async fn save_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let saved_at = app_state.save();
    Json(serde_json::json!({ "saved_at": saved_at }))
}

#[derive(Deserialize)]
pub struct TutorialRequest {
    complete: bool,
}

pub async fn tutorial_handler(State(app_state): State<AppState>) -> Json<serde_json::Value> {
    let complete = app_state.store.lock().tutorial_complete();
    Json(serde_json::json!({ "complete": complete }))
}

pub async fn set_tutorial_handler(
    State(app_state): State<AppState>,
    Json(request): Json<TutorialRequest>,
) -> Json<serde_json::Value> {
    app_state
        .store
        .lock()
        .set_tutorial_complete(request.complete);
    Json(serde_json::json!({ "complete": request.complete }))
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

pub async fn stream_handler(
    State(app_state): State<AppState>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = app_state.report_tx.subscribe();
    let session = app_state.session.clone();

    let stream = async_stream::stream! {
        let mut heartbeat = tokio::time::interval(Duration::from_secs(5));
        heartbeat.tick().await; // discard the immediate first tick
        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(report) => {
                            let data = serde_json::to_string(&report).unwrap_or_default();
                            yield Ok(Event::default().event("tick").data(data));
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "stream subscriber lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = heartbeat.tick() => {
                    let minutes = session.lock().state().elapsed.minutes;
                    let hb = serde_json::json!({"heartbeat": true, "elapsed_minutes": minutes});
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
