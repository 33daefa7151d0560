//! Record Normalization and Log Codec
//!
//! Turns raw alerts into [`AlertRecord`]s and converts per-key logs to and
//! from their on-disk JSON form.

use tracing::trace;

use crate::error::{CodecError, Skip};
use crate::model::{AlertRecord, RawAlert};

/// Label holding the owning team
pub const TEAM_LABEL: &str = "team";
/// Label holding the alert severity
pub const SEVERITY_LABEL: &str = "severity";
/// Annotation holding the one-line summary
pub const SUMMARY_ANNOTATION: &str = "summary";
/// Annotation holding the long description
pub const DESCRIPTION_ANNOTATION: &str = "description";

/// Build the persisted record for one raw alert.
///
/// Pure: the same alert and timestamp always give the same record.
/// Alerts without a non-empty `team` or `severity` label are skipped.
pub fn normalize(alert: &RawAlert, timestamp: &str) -> Result<AlertRecord, Skip> {
    let team = alert.label(TEAM_LABEL).ok_or(Skip::MissingTeam)?;
    let severity = alert.label(SEVERITY_LABEL).ok_or(Skip::MissingSeverity)?;

    trace!("Normalized alert for {}/{}", team, severity);

    Ok(AlertRecord {
        team: team.to_string(),
        severity: severity.to_string(),
        summary: alert.annotation(SUMMARY_ANNOTATION).map(str::to_string),
        description: alert.annotation(DESCRIPTION_ANNOTATION).map(str::to_string),
        timestamp: timestamp.to_string(),
    })
}

/// Encode a whole log as a pretty-printed (2-space) JSON array
pub fn encode_log(records: &[AlertRecord]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec_pretty(records).map_err(CodecError::Serialization)
}

/// Decode a log file.
///
/// Empty or truncated content is a parse error, not an empty log.
pub fn decode_log(bytes: &[u8]) -> Result<Vec<AlertRecord>, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Parse)
}

/// Compact JSON for a single record, used as the notification text
pub fn encode_record(record: &AlertRecord) -> Result<String, CodecError> {
    serde_json::to_string(record).map_err(CodecError::Serialization)
}
