//! Manual buzzer control.
//!
//! These actions bypass threshold evaluation and leave the monitor's alarm
//! edges untouched. Unlike automatic actuation, the device call is awaited and
//! its failure is reported to the caller as a 500.

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Serialize;
use tracing::{error, info};

use super::AppState;
use crate::Result;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/buzzer/activate", post(activate))
        .route("/buzzer/deactivate", post(deactivate))
}

#[derive(Serialize)]
struct BuzzerResponse {
    status: String,
}

async fn activate(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /buzzer/activate");
    respond("activate", state.buzzer.activate().await)
}

async fn deactivate(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /buzzer/deactivate");
    respond("deactivate", state.buzzer.deactivate().await)
}

fn respond(action: &str, outcome: Result<()>) -> (StatusCode, Json<BuzzerResponse>) {
    // ---
    match outcome {
        Ok(()) => {
            info!("Buzzer {} succeeded", action);
            (
                StatusCode::OK,
                Json(BuzzerResponse {
                    status: format!("Buzzer {}d", action),
                }),
            )
        }
        Err(e) => {
            error!("Buzzer {} failed: {}", action, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(BuzzerResponse {
                    status: format!("Failed to {} buzzer: {}", action, e),
                }),
            )
        }
    }
}
