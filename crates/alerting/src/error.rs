//! Codec Error Types

use thiserror::Error;

/// Reason an alert was left out of persistence and notification.
///
/// Skips are expected for alerts that are not routed by team; they are
/// counted but never reported as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Skip {
    /// `labels.team` missing or empty
    #[error("missing label: team")]
    MissingTeam,

    /// `labels.severity` missing or empty
    #[error("missing label: severity")]
    MissingSeverity,
}

/// Errors while encoding or decoding persisted records
#[derive(Debug, Error)]
pub enum CodecError {
    /// Log content is not a JSON array of records
    #[error("Parse error: {0}")]
    Parse(#[source] serde_json::Error),

    /// Record could not be rendered as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),
}

/// Inbound payload is not a recognizable alert batch
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Malformed alert batch: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for BatchError {
    fn from(err: serde_json::Error) -> Self {
        BatchError::Malformed(err.to_string())
    }
}
