//! Inbound Batch and Persisted Record Types

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::error::BatchError;

/// One inbound webhook payload.
///
/// Only `alerts` is read; the other Alertmanager envelope fields
/// (`version`, `status`, `groupLabels`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertBatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub alerts: Vec<RawAlert>,
}

impl AlertBatch {
    /// Parse a request body into a batch.
    ///
    /// A missing or null `alerts` field yields an empty batch. A top level
    /// that is not a JSON object is rejected even if serde could coerce it.
    pub fn from_slice(body: &[u8]) -> Result<Self, BatchError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(BatchError::Malformed(
                "expected a JSON object with an `alerts` array".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

/// A single alert as sent by the monitoring system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: BTreeMap<String, String>,
}

impl RawAlert {
    /// Non-empty label value
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations.get(name).map(String::as_str)
    }
}

/// Normalized alert as stored in a per-key log.
///
/// Field order matches the on-disk layout:
/// `team, severity, summary, description, time_stamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub team: String,
    pub severity: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Batch receive time, `YYYYMMDD-HH:MM:SS`
    #[serde(rename = "time_stamp")]
    pub timestamp: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
