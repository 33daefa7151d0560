//! Batch outcome types

use serde::Serialize;

/// Which stage failed for an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Not persisted (and therefore not notified)
    StoreError,
    /// Persisted, but the notification did not go out
    NotifyError,
}

/// Failure of one alert inside a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertError {
    /// Position of the alert in the inbound batch
    pub alert_index: usize,
    pub kind: ErrorKind,
    pub detail: String,
}

impl AlertError {
    pub fn store(alert_index: usize, detail: impl ToString) -> Self {
        Self {
            alert_index,
            kind: ErrorKind::StoreError,
            detail: detail.to_string(),
        }
    }

    pub fn notify(alert_index: usize, detail: impl ToString) -> Self {
        Self {
            alert_index,
            kind: ErrorKind::NotifyError,
            detail: detail.to_string(),
        }
    }
}

/// Aggregate outcome of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    /// Alerts persisted (notified or not)
    pub processed: usize,
    /// Alerts without team/severity
    pub skipped: usize,
    pub errors: Vec<AlertError>,
}

impl BatchResult {
    /// No per-alert failures
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }
}
