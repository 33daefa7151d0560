//! Batch Timestamps

use chrono::Local;

/// Format used for `time_stamp` in persisted records
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M:%S";

/// Source of the per-batch timestamp
pub trait TimestampProvider: Send + Sync {
    /// Current time as `YYYYMMDD-HH:MM:SS`
    fn now(&self) -> String;
}

/// Wall clock in the local time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl TimestampProvider for LocalClock {
    fn now(&self) -> String {
        Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Always returns the same timestamp
#[derive(Debug, Clone)]
pub struct FixedClock(pub String);

impl FixedClock {
    pub fn new(timestamp: impl Into<String>) -> Self {
        Self(timestamp.into())
    }
}

impl TimestampProvider for FixedClock {
    fn now(&self) -> String {
        self.0.clone()
    }
}
