//! Edge-triggered sensor alarm evaluator.
//!
//! [`SensorEventMonitor`] accepts readings while active, renders every metric
//! it receives and fires the alarm actuator once per rising edge: the
//! transition of a metric from below its threshold to at-or-above it. A
//! sustained out-of-range condition therefore produces a single actuation.
//! Dropping back below the threshold clears the edge so that the next
//! crossing fires again; it does not deactivate the alarm.
//!
//! Edge detection follows delivery order, not timestamp order.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::{AlarmActuator, DisplaySink, Metric, SensorReading, ThresholdSet};

// ---

/// Read-only view of the monitor state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorSnapshot {
    // ---
    pub active: bool,
    pub thresholds: ThresholdSet,
    pub alarm_asserted: BTreeMap<Metric, bool>,
}

/// What a single [`SensorEventMonitor::on_reading`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadingOutcome {
    // ---
    /// Readings received while inactive are discarded.
    pub accepted: bool,
    pub rendered: usize,
    /// Metrics whose rising edge fired the actuator.
    pub fired: Vec<Metric>,
}

/// Single-consumer alarm evaluator, owning its display sink and actuator.
pub struct SensorEventMonitor<D, A> {
    display: D,
    actuator: A,
    active: bool,
    thresholds: ThresholdSet,
    alarm_asserted: BTreeMap<Metric, bool>,
}

impl<D, A> SensorEventMonitor<D, A>
where
    D: DisplaySink,
    A: AlarmActuator,
{
    /// Create an inactive monitor.
    pub fn new(display: D, actuator: A) -> Self {
        Self {
            display,
            actuator,
            active: false,
            thresholds: ThresholdSet::new(),
            alarm_asserted: cleared(),
        }
    }

    /// Begin accepting readings against `thresholds`.
    ///
    /// Calling this while already active replaces the thresholds and clears
    /// every asserted alarm.
    pub fn start(&mut self, thresholds: ThresholdSet) {
        // ---
        if thresholds.is_empty() {
            warn!("Monitor started without thresholds; alarm evaluation disabled");
        }
        debug!("Monitor started, {} thresholds", thresholds.len());

        self.active = true;
        self.thresholds = thresholds;
        self.alarm_asserted = cleared();
    }

    /// Stop accepting readings. Takes effect for the very next reading.
    pub fn stop(&mut self) {
        // ---
        debug!("Monitor stopped");
        self.active = false;
        self.alarm_asserted = cleared();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_asserted(&self, metric: Metric) -> bool {
        self.alarm_asserted.get(&metric).copied().unwrap_or(false)
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        // ---
        MonitorSnapshot {
            active: self.active,
            thresholds: self.thresholds.clone(),
            alarm_asserted: self.alarm_asserted.clone(),
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Process one reading from the transport.
    pub fn on_reading(&mut self, reading: &SensorReading) -> ReadingOutcome {
        // ---
        if !self.active {
            return ReadingOutcome::default();
        }

        let mut outcome = ReadingOutcome {
            accepted: true,
            ..ReadingOutcome::default()
        };

        // Display is unconditional while active.
        for (&metric, &value) in &reading.metrics {
            self.display.render(metric, value, reading.timestamp);
            outcome.rendered += 1;
        }

        for (&metric, &value) in &reading.metrics {
            let Some(limit) = self.thresholds.get(metric) else {
                continue;
            };

            let asserted = self.alarm_asserted.entry(metric).or_insert(false);

            if value >= limit {
                if !*asserted {
                    *asserted = true;
                    warn!("Alarm triggered: {} = {} reached {}", metric, value, limit);
                    self.actuator.activate_alarm();
                    outcome.fired.push(metric);
                }
            } else if *asserted {
                debug!("Alarm edge cleared: {} = {} below {}", metric, value, limit);
                *asserted = false;
            }
        }

        outcome
    }
}

fn cleared() -> BTreeMap<Metric, bool> {
    Metric::ALL.into_iter().map(|m| (m, false)).collect()
}
