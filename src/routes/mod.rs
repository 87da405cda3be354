//! HTTP control surface gateway.
//!
//! Each sibling module exports a subrouter; this gateway merges them and
//! attaches the shared [`AppState`], so `main.rs` never sees individual
//! endpoints.

use axum::Router;

use crate::{HttpBuzzer, HttpThresholdStore, LiveDisplay, SessionHandle};

mod buzzer;
mod health;
mod monitor;
mod readings;

// ---

/// State shared by every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    // ---
    pub session: SessionHandle,
    pub display: LiveDisplay,
    pub thresholds: HttpThresholdStore,
    /// Manual control; the session owns its own copy for automatic alarms.
    pub buzzer: HttpBuzzer,
    pub user_id: String,
}

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(monitor::router())
        .merge(readings::router())
        .merge(buzzer::router())
        .merge(health::router())
        .with_state(state)
}
