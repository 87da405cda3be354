use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json,
    Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::AppState;
use crate::MonitorError;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/monitor/start", post(start))
        .route("/monitor/stop", post(stop))
        .route("/monitor/status", get(status))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn session_error(e: MonitorError) -> axum::response::Response {
    // ---
    error!("Monitor session error: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: e.to_string(),
        }),
    )
        .into_response()
}

/// Handle `POST /monitor/start`.
///
/// Resolves thresholds for the configured user and (re)starts the session.
/// Threshold failures still start the session, with alarms disabled.
async fn start(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("POST /monitor/start");

    match state
        .session
        .start_with(&state.thresholds, &state.user_id)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => session_error(e),
    }
}

#[derive(Serialize)]
struct StopResponse {
    active: bool,
}

/// Handle `POST /monitor/stop`.
async fn stop(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    info!("POST /monitor/stop");

    match state.session.stop().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(StopResponse {
                active: snapshot.active,
            }),
        )
            .into_response(),
        Err(e) => session_error(e),
    }
}

/// Handle `GET /monitor/status`.
async fn status(State(state): State<AppState>) -> impl IntoResponse {
    // ---
    match state.session.status().await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => session_error(e),
    }
}
