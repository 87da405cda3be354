//! Alarm actuation.
//!
//! The monitor only ever asks for activation, once per rising edge. Those calls
//! are fire-and-forget: the outcome is logged here and never reported back, so
//! a failed actuation is not retried until the edge clears and re-triggers.
//! Manual control uses [`HttpBuzzer::activate`] and [`HttpBuzzer::deactivate`]
//! directly and gets the outcome back.

use std::sync::Arc;

use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, error, info};

use crate::{MonitorError, Result};

// ---

/// Outbound alarm actuator (the "buzzer").
pub trait AlarmActuator {
    fn activate_alarm(&mut self);
    fn deactivate_alarm(&mut self);
}

/// Buzzer driven through the device's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpBuzzer {
    // ---
    client: Client,
    activate_url: Arc<str>,
    deactivate_url: Arc<str>,
}

impl HttpBuzzer {
    // ---
    pub fn new(client: Client, activate_url: &str, deactivate_url: &str) -> Self {
        Self {
            client,
            activate_url: activate_url.into(),
            deactivate_url: deactivate_url.into(),
        }
    }

    /// POST to the activation endpoint and wait for the outcome.
    pub async fn activate(&self) -> Result<()> {
        post(&self.client, &self.activate_url).await
    }

    /// POST to the deactivation endpoint and wait for the outcome.
    pub async fn deactivate(&self) -> Result<()> {
        post(&self.client, &self.deactivate_url).await
    }

    /// Run one actuation in the background, logging its outcome.
    fn fire(&self, action: &'static str, url: Arc<str>) {
        // ---
        let Ok(handle) = Handle::try_current() else {
            error!("Cannot {} buzzer: no async runtime available", action);
            return;
        };

        let client = self.client.clone();
        handle.spawn(async move {
            match post(&client, &url).await {
                Ok(()) => info!("Buzzer {} request succeeded", action),
                Err(e) => error!("Buzzer {} request failed: {}", action, e),
            }
        });
    }
}

impl AlarmActuator for HttpBuzzer {
    fn activate_alarm(&mut self) {
        self.fire("activate", Arc::clone(&self.activate_url));
    }

    fn deactivate_alarm(&mut self) {
        self.fire("deactivate", Arc::clone(&self.deactivate_url));
    }
}

async fn post(client: &Client, url: &str) -> Result<()> {
    // ---
    debug!("POST {}", url);

    let response = client
        .post(url)
        .send()
        .await
        .map_err(|e| MonitorError::ActuatorFailure(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(MonitorError::ActuatorFailure(format!(
            "{} returned {}",
            url, status
        )));
    }

    Ok(())
}
