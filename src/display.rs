//! Display sink for accepted readings.
//!
//! The monitor pushes every accepted metric value into a [`DisplaySink`].
//! [`LiveDisplay`] is the production sink: an in-memory dashboard snapshot
//! shared between the session task (writer) and the HTTP handlers (readers).

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Metric;

/// Text shown on a card when no live value is available.
pub const PLACEHOLDER: &str = "--";

// ---

/// Write-only destination for displayed readings.
///
/// Implementations must not fail back into the monitor; any rendering error
/// is the sink's own business.
pub trait DisplaySink {
    /// Show `value` for `metric`, measured at `timestamp`.
    fn render(&mut self, metric: Metric, value: f64, timestamp: DateTime<Utc>);

    /// Replace every shown value with a neutral `text`.
    fn show_placeholder(&mut self, text: &str);
}

/// One dashboard card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCard {
    // ---
    pub value: Option<f64>,
    pub text: String,
}

impl MetricCard {
    fn placeholder(text: &str) -> Self {
        Self {
            value: None,
            text: text.to_string(),
        }
    }
}

/// Snapshot of every card plus the last time a value was rendered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    // ---
    pub cards: BTreeMap<Metric, MetricCard>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Default for DisplayState {
    fn default() -> Self {
        // ---
        let cards = Metric::ALL
            .into_iter()
            .map(|m| (m, MetricCard::placeholder(PLACEHOLDER)))
            .collect();

        Self {
            cards,
            last_updated: None,
        }
    }
}

/// Shared live dashboard. Cloning yields another handle to the same state.
#[derive(Debug, Clone, Default)]
pub struct LiveDisplay {
    state: Arc<RwLock<DisplayState>>,
}

impl LiveDisplay {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current dashboard state.
    pub fn snapshot(&self) -> DisplayState {
        // ---
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn with_state(&self, f: impl FnOnce(&mut DisplayState)) {
        // ---
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }
}

impl DisplaySink for LiveDisplay {
    fn render(&mut self, metric: Metric, value: f64, timestamp: DateTime<Utc>) {
        // ---
        let text = format!("{:.2} {}", value, metric.unit());
        tracing::trace!("render {} = {}", metric, text);

        self.with_state(|state| {
            state.cards.insert(
                metric,
                MetricCard {
                    value: Some(value),
                    text,
                },
            );
            state.last_updated = Some(timestamp);
        });
    }

    fn show_placeholder(&mut self, text: &str) {
        // ---
        self.with_state(|state| {
            for card in state.cards.values_mut() {
                *card = MetricCard::placeholder(text);
            }
        });
    }
}
