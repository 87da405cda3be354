//! Threshold lookup.
//!
//! Thresholds are resolved once when monitoring starts and handed to the
//! monitor as an immutable snapshot. A store failure is fail-open: the
//! session runs with an empty set, which disables alarms but keeps the live
//! display going.

use std::future::Future;
use std::sync::Arc;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{MonitorError, Result, ThresholdSet};

// ---

/// Source of per-user threshold sets.
pub trait ThresholdStore {
    fn get_thresholds(&self, user_id: &str) -> impl Future<Output = Result<ThresholdSet>> + Send;
}

/// Outcome of [`resolve_thresholds`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedThresholds {
    // ---
    /// Thresholds to run with; empty when the store failed.
    pub thresholds: ThresholdSet,

    /// The store failure, if any, reported once to the caller.
    pub error: Option<MonitorError>,
}

/// Resolve thresholds for `user_id`, falling back to an empty set on failure.
pub async fn resolve_thresholds<S>(store: &S, user_id: &str) -> ResolvedThresholds
where
    S: ThresholdStore + ?Sized,
{
    // ---
    match store.get_thresholds(user_id).await {
        Ok(thresholds) => {
            info!("Thresholds loaded for {}: {:?}", user_id, thresholds);
            ResolvedThresholds {
                thresholds,
                error: None,
            }
        }
        Err(e) => {
            warn!(
                "Thresholds unavailable for {}, alarms disabled: {}",
                user_id, e
            );
            ResolvedThresholds {
                thresholds: ThresholdSet::new(),
                error: Some(e),
            }
        }
    }
}

/// Threshold store backed by the dashboard backend's `get_thresholds` endpoint.
#[derive(Debug, Clone)]
pub struct HttpThresholdStore {
    client: Client,
    url: Arc<str>,
}

impl HttpThresholdStore {
    // ---
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl ThresholdStore for HttpThresholdStore {
    async fn get_thresholds(&self, user_id: &str) -> Result<ThresholdSet> {
        // ---
        debug!("Fetching thresholds from {} for {}", self.url, user_id);

        let response = self
            .client
            .get(&*self.url)
            .query(&[("email", user_id)])
            .send()
            .await
            .map_err(|e| MonitorError::ThresholdUnavailable(e.to_string()))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| MonitorError::ThresholdUnavailable(e.to_string()))?;

        debug!("Threshold response ({}): {}", status, payload);

        parse_threshold_payload(status.is_success(), &payload)
    }
}

/// Interpret a threshold store response body.
///
/// The backend answers either with a flat `{metric: limit}` object or with
/// `{"error": "..."}`.
fn parse_threshold_payload(success: bool, payload: &Value) -> Result<ThresholdSet> {
    // ---
    if let Some(message) = payload.get("error") {
        let message = message
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| message.to_string());
        return Err(MonitorError::ThresholdUnavailable(message));
    }

    if !success || !payload.is_object() {
        return Err(MonitorError::ThresholdUnavailable(format!(
            "unexpected threshold response: {}",
            payload
        )));
    }

    Ok(ThresholdSet::from_json(payload))
}
