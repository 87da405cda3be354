//! Error taxonomy for the sensor monitor.
//!
//! None of these errors is fatal to the monitor. Each one is absorbed into a
//! degraded mode or a no-op at the point where it is raised:
//! - threshold failures fall back to "no alarms configured"
//! - actuator failures are logged and never retried; a manual buzzer request
//!   reports them to its caller
//! - transport failures surface as a disconnect on the reading feed
//!
//! A metric missing from a reading or a threshold set is not an error value at
//! all; it is skipped where it is encountered.

use thiserror::Error;

/// Errors produced by the monitor's collaborators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    /// The threshold store could not resolve a threshold set.
    #[error("thresholds unavailable: {0}")]
    ThresholdUnavailable(String),

    /// The outbound alarm call failed.
    #[error("alarm actuation failed: {0}")]
    ActuatorFailure(String),

    /// The device data endpoint was unreachable or returned garbage.
    #[error("sensor transport error: {0}")]
    Transport(String),

    /// The session task has exited and can no longer accept commands.
    #[error("monitor session is closed")]
    SessionClosed,
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;
