//! Error types of the regulation core and its collaborators.

use std::io;

use thiserror::Error;

/// Failure to deliver a command to an equipment's hardware.
#[derive(Debug, Error)]
pub enum ActuatorError {
    #[error("failed to write actuator command: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode actuator command: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure to publish a status snapshot.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write status snapshot: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode status snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),
}

/// Fault that aborts one evaluation tick.
#[derive(Debug, Error)]
pub enum RegulationError {
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Inbound line that could not be turned into an event.
#[derive(Debug, Error)]
pub enum InboundError {
    #[error("empty line")]
    Empty,

    #[error("unknown topic `{0}`")]
    UnknownTopic(String),

    #[error("invalid payload on `{topic}`: {source}")]
    Payload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("reading on `{topic}` out of range: {value} W")]
    OutOfRange { topic: String, value: f64 },
}
