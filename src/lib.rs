//! Live sensor monitor with edge-triggered threshold alarms.
//!
//! The core is [`SensorEventMonitor`], which renders every accepted reading
//! and fires the alarm actuator once per rising edge of a metric crossing its
//! threshold. Around it:
//! - `thresholds` resolves per-user limits (fail-open on errors)
//! - `display` keeps the live dashboard snapshot
//! - `actuator` drives the buzzer
//! - `feed` polls the device for readings
//! - `session` owns the monitor and serializes all events
//! - `routes` exposes the HTTP control surface
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): siblings import
//! shared types through the crate root, never from each other's files.

use axum::Router;
use reqwest::Client;

mod actuator;
mod config;
mod display;
mod error;
mod feed;
mod models;
mod monitor;
mod routes;
mod session;
mod thresholds;

pub use actuator::{AlarmActuator, HttpBuzzer};
pub use config::{load_from_env, Config};
pub use display::{DisplaySink, DisplayState, LiveDisplay, MetricCard, PLACEHOLDER};
pub use error::{MonitorError, Result};
pub use feed::{FeedEvent, FeedMessage, HttpReadingSource, Poller, ReadingSource};
pub use models::{Metric, RawDeviceReading, SensorReading, ThresholdSet};
pub use monitor::{MonitorSnapshot, ReadingOutcome, SensorEventMonitor};
pub use routes::AppState;
pub use session::{Session, SessionHandle, StartReport};
pub use thresholds::{resolve_thresholds, HttpThresholdStore, ResolvedThresholds, ThresholdStore};

// ---

/// A wired service: the HTTP router plus the state its handlers share.
pub struct App {
    pub router: Router,
    pub state: AppState,
}

/// Wire collaborators from `cfg` and spawn the monitor session.
///
/// The session runs until the last [`SessionHandle`] in the state is dropped.
/// Must be called from within a tokio runtime.
pub fn build_app(cfg: &Config) -> anyhow::Result<App> {
    // ---
    let client = Client::builder().timeout(cfg.http_timeout()).build()?;

    let display = LiveDisplay::new();
    let buzzer = HttpBuzzer::new(client.clone(), &cfg.buzzer_url, &cfg.buzzer_deactivate_url);
    let source = HttpReadingSource::new(client.clone(), &cfg.sensor_data_url);
    let thresholds = HttpThresholdStore::new(client, &cfg.threshold_api_url);

    let monitor = SensorEventMonitor::new(display.clone(), buzzer.clone());
    let (session, handle) = Session::new(monitor, source, cfg.poll_interval());
    session.spawn();

    let state = AppState {
        session: handle,
        display,
        thresholds,
        buzzer,
        user_id: cfg.user_id.clone(),
    };

    Ok(App {
        router: routes::router(state.clone()),
        state,
    })
}
