use axum::{extract::State, routing::get, Json, Router};
use tracing::debug;

use super::AppState;
use crate::DisplayState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/readings/latest", get(latest))
}

/// Handle `GET /readings/latest`: the live dashboard cards.
async fn latest(State(state): State<AppState>) -> Json<DisplayState> {
    // ---
    debug!("GET /readings/latest");
    Json(state.display.snapshot())
}
