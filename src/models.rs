//! Data models for the sensor monitor.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---

/// The closed set of metrics reported by a sensor device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
    Light,
    Smoke,
}

impl Metric {
    /// Every metric, in display order.
    pub const ALL: [Metric; 4] = [
        Metric::Temperature,
        Metric::Humidity,
        Metric::Light,
        Metric::Smoke,
    ];

    /// Wire name of the metric.
    pub fn as_str(self) -> &'static str {
        // ---
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Light => "light",
            Metric::Smoke => "smoke",
        }
    }

    /// Display unit shown next to the value on a dashboard card.
    pub fn unit(self) -> &'static str {
        // ---
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Light => "%",
            Metric::Smoke => "ppm",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A point-in-time measurement from one device.
///
/// Readings may be partial: a metric that the device did not report is simply
/// absent from `metrics`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    // ---
    pub timestamp: DateTime<Utc>,
    pub metrics: BTreeMap<Metric, f64>,
}

impl SensorReading {
    // ---
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style helper to add one metric value.
    pub fn with(mut self, metric: Metric, value: f64) -> Self {
        // ---
        self.metrics.insert(metric, value);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.metrics.get(&metric).copied()
    }
}

/// Raw payload served by the device's data endpoint.
///
/// Field names follow the firmware (`lightLevel`, `coLevel`). Every field is
/// kept as a loose JSON value so that one bad field does not discard the
/// whole reading.
#[derive(Debug, Deserialize)]
pub struct RawDeviceReading {
    // ---
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub humidity: Option<Value>,
    #[serde(default, rename = "lightLevel")]
    pub light_level: Option<Value>,
    #[serde(default, rename = "coLevel")]
    pub co_level: Option<Value>,
}

impl RawDeviceReading {
    /// Convert into a [`SensorReading`] stamped with `timestamp`.
    ///
    /// Absent or non-numeric fields are skipped.
    pub fn to_reading(&self, timestamp: DateTime<Utc>) -> SensorReading {
        // ---
        let fields = [
            (Metric::Temperature, &self.temperature),
            (Metric::Humidity, &self.humidity),
            (Metric::Light, &self.light_level),
            (Metric::Smoke, &self.co_level),
        ];

        let metrics = fields
            .into_iter()
            .filter_map(|(metric, raw)| {
                raw.as_ref()
                    .and_then(Value::as_f64)
                    .map(|value| (metric, value))
            })
            .collect();

        SensorReading { timestamp, metrics }
    }
}

/// Per-metric inclusive upper limits.
///
/// A metric without an entry has no threshold configured and is never
/// evaluated for alarms. An empty set disables alarm evaluation entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ThresholdSet(BTreeMap<Metric, f64>);

impl ThresholdSet {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to configure one limit.
    pub fn with(mut self, metric: Metric, limit: f64) -> Self {
        // ---
        self.0.insert(metric, limit);
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Build a threshold set from the store's JSON object.
    ///
    /// `null` and non-numeric entries mean "no threshold" for that metric.
    pub fn from_json(payload: &Value) -> Self {
        // ---
        let limits = Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                payload
                    .get(metric.as_str())
                    .and_then(Value::as_f64)
                    .map(|limit| (metric, limit))
            })
            .collect();

        ThresholdSet(limits)
    }
}
