//! Monitoring session runtime.
//!
//! A [`Session`] is the single task that owns the [`SensorEventMonitor`]. It
//! handles control commands and feed events one at a time, in delivery order,
//! so the monitor state is never shared. Callers talk to it through a
//! cloneable [`SessionHandle`].
//!
//! The session also owns the collaborator duties around the monitor:
//! - start and abort the periodic poller together with the monitor
//! - show placeholders on the display when the feed disconnects
//! - drop feed events left over from a stopped poller run

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    resolve_thresholds, AlarmActuator, DisplaySink, FeedEvent, FeedMessage, MonitorError,
    MonitorSnapshot, Poller, ReadingSource, Result, SensorEventMonitor, ThresholdSet,
    ThresholdStore, PLACEHOLDER,
};

const COMMAND_QUEUE: usize = 32;
const FEED_QUEUE: usize = 64;

// ---

enum Command {
    Start {
        thresholds: ThresholdSet,
        reply: oneshot::Sender<MonitorSnapshot>,
    },
    Stop {
        reply: oneshot::Sender<MonitorSnapshot>,
    },
    Status {
        reply: oneshot::Sender<MonitorSnapshot>,
    },
}

/// Result of [`SessionHandle::start_with`].
#[derive(Debug, Clone, Serialize)]
pub struct StartReport {
    // ---
    pub active: bool,
    pub alarms_enabled: bool,
    pub thresholds: ThresholdSet,
    /// Set when thresholds could not be loaded and alarms were disabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Cloneable front door to a running [`Session`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
}

impl SessionHandle {
    // ---
    /// Start (or restart) monitoring with `thresholds`.
    pub async fn start(&self, thresholds: ThresholdSet) -> Result<MonitorSnapshot> {
        self.request(|reply| Command::Start { thresholds, reply })
            .await
    }

    /// Resolve thresholds from `store` and start monitoring.
    ///
    /// A store failure does not prevent the start; alarms are disabled and
    /// the failure is reported in [`StartReport::warning`].
    pub async fn start_with<S>(&self, store: &S, user_id: &str) -> Result<StartReport>
    where
        S: ThresholdStore + ?Sized,
    {
        // ---
        let resolved = resolve_thresholds(store, user_id).await;
        let snapshot = self.start(resolved.thresholds).await?;

        Ok(StartReport {
            active: snapshot.active,
            alarms_enabled: !snapshot.thresholds.is_empty(),
            thresholds: snapshot.thresholds,
            warning: resolved.error.map(|e| e.to_string()),
        })
    }

    pub async fn stop(&self) -> Result<MonitorSnapshot> {
        self.request(|reply| Command::Stop { reply }).await
    }

    pub async fn status(&self) -> Result<MonitorSnapshot> {
        self.request(|reply| Command::Status { reply }).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        // ---
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| MonitorError::SessionClosed)?;
        response.await.map_err(|_| MonitorError::SessionClosed)
    }
}

/// Task owning the monitor, its poller and the inbound queues.
pub struct Session<D, A, S> {
    monitor: SensorEventMonitor<D, A>,
    poller: Poller<S>,
    commands: mpsc::Receiver<Command>,
    feed: mpsc::Receiver<FeedMessage>,
}

impl<D, A, S> Session<D, A, S>
where
    D: DisplaySink + Send + 'static,
    A: AlarmActuator + Send + 'static,
    S: ReadingSource + Send + Sync + 'static,
{
    /// Build a session polling `source` every `period`.
    pub fn new(
        monitor: SensorEventMonitor<D, A>,
        source: S,
        period: Duration,
    ) -> (Self, SessionHandle) {
        // ---
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (feed_tx, feed_rx) = mpsc::channel(FEED_QUEUE);

        let session = Self {
            monitor,
            poller: Poller::new(source, period, feed_tx),
            commands: command_rx,
            feed: feed_rx,
        };

        (
            session,
            SessionHandle {
                commands: command_tx,
            },
        )
    }

    /// Spawn the session onto the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the session until every [`SessionHandle`] is dropped.
    pub async fn run(mut self) {
        // ---
        info!("Monitor session running");

        loop {
            tokio::select! {
                // Commands first so a stop is seen before any queued reading.
                biased;

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(message) = self.feed.recv() => self.handle_feed(message),
            }
        }

        self.monitor.stop();
        self.poller.stop();
        info!("Monitor session closed");
    }

    fn handle_command(&mut self, command: Command) {
        // ---
        match command {
            Command::Start { thresholds, reply } => {
                self.monitor.start(thresholds);
                self.poller.start();
                let _ = reply.send(self.monitor.snapshot());
            }
            Command::Stop { reply } => {
                // Gate readings before the poller goes away. Anything the
                // stopped run already queued is dropped by generation.
                self.monitor.stop();
                self.poller.stop();
                let _ = reply.send(self.monitor.snapshot());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.monitor.snapshot());
            }
        }
    }

    fn handle_feed(&mut self, message: FeedMessage) {
        // ---
        // Left over from a poller run that has since been stopped.
        if message.generation != self.poller.generation() {
            debug!(
                "Dropping stale feed event from generation {}",
                message.generation
            );
            return;
        }

        match message.event {
            FeedEvent::Reading(reading) => {
                let outcome = self.monitor.on_reading(&reading);
                if outcome.accepted {
                    debug!(
                        "Reading at {} rendered {} metrics, fired {:?}",
                        reading.timestamp, outcome.rendered, outcome.fired
                    );
                }
            }
            FeedEvent::Connected => info!("Sensor feed connected"),
            FeedEvent::Disconnected => {
                warn!("Sensor feed disconnected");
                if self.monitor.is_active() {
                    self.monitor.display_mut().show_placeholder(PLACEHOLDER);
                }
            }
        }
    }
}
