//! Live reading feed.
//!
//! A [`Poller`] requests a fresh reading from a [`ReadingSource`] on a fixed
//! interval and forwards the results as [`FeedEvent`]s. Connectivity changes
//! are reported once per transition rather than on every failed poll.
//!
//! The poller is the cancellable periodic task behind a monitoring session:
//! it is started when monitoring starts and aborted when it stops. Every run
//! tags its messages with a generation number, so events still queued (or
//! sent by a task that has not yet observed its abort) can be told apart from
//! those of the current run.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use reqwest::Client;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{MonitorError, RawDeviceReading, Result, SensorReading};

// ---

/// Events delivered by the feed, in poll order.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected,
    Reading(SensorReading),
}

/// A [`FeedEvent`] tagged with the poller run that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    pub generation: u64,
    pub event: FeedEvent,
}

/// Anything that can produce one reading on request.
pub trait ReadingSource {
    fn fetch(&self) -> impl Future<Output = Result<SensorReading>> + Send;
}

/// Reads the device's JSON data endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReadingSource {
    client: Client,
    url: Arc<str>,
}

impl HttpReadingSource {
    // ---
    pub fn new(client: Client, url: &str) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl ReadingSource for HttpReadingSource {
    async fn fetch(&self) -> Result<SensorReading> {
        // ---
        let response = self
            .client
            .get(&*self.url)
            .send()
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Transport(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let raw: RawDeviceReading = response
            .json()
            .await
            .map_err(|e| MonitorError::Transport(e.to_string()))?;

        // The device does not timestamp its readings.
        Ok(raw.to_reading(Utc::now()))
    }
}

/// Cancellable periodic poll of a [`ReadingSource`].
pub struct Poller<S> {
    source: Arc<S>,
    period: Duration,
    events: mpsc::Sender<FeedMessage>,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl<S> Poller<S>
where
    S: ReadingSource + Send + Sync + 'static,
{
    pub fn new(source: S, period: Duration, events: mpsc::Sender<FeedMessage>) -> Self {
        Self {
            source: Arc::new(source),
            period,
            events,
            generation: 0,
            task: None,
        }
    }

    /// Spawn the poll task. The first poll happens immediately.
    ///
    /// A poller that is already running is left untouched.
    pub fn start(&mut self) {
        // ---
        if self.is_running() {
            debug!("Poller already running");
            return;
        }

        self.generation += 1;
        info!(
            "Starting reading poller every {:?} (generation {})",
            self.period, self.generation
        );
        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        self.task = Some(tokio::spawn(poll_loop(
            source,
            self.period,
            self.generation,
            events,
        )));
    }

    /// Abort the poll task, if any.
    ///
    /// Messages from the aborted run no longer match [`Poller::generation`].
    pub fn stop(&mut self) {
        // ---
        self.generation += 1;
        if let Some(task) = self.task.take() {
            info!("Stopping reading poller");
            task.abort();
        }
    }

    /// Generation of the current run; stale runs carry a smaller number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<S> Drop for Poller<S> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll_loop<S>(
    source: Arc<S>,
    period: Duration,
    generation: u64,
    events: mpsc::Sender<FeedMessage>,
) where
    S: ReadingSource + Send + Sync,
{
    // ---
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut connected: Option<bool> = None;

    loop {
        ticker.tick().await;

        let mut batch = Vec::with_capacity(2);
        match source.fetch().await {
            Ok(reading) => {
                if connected != Some(true) {
                    connected = Some(true);
                    batch.push(FeedEvent::Connected);
                }
                batch.push(FeedEvent::Reading(reading));
            }
            Err(e) => {
                warn!("Sensor poll failed: {}", e);
                if connected != Some(false) {
                    connected = Some(false);
                    batch.push(FeedEvent::Disconnected);
                }
            }
        }

        for event in batch {
            let message = FeedMessage { generation, event };
            if events.send(message).await.is_err() {
                debug!("Feed receiver dropped, poller exiting");
                return;
            }
        }
    }
}
