//! Pipeline configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::PipelineError;

/// Per-alert time bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bound on one store append (milliseconds)
    pub store_timeout_ms: u64,
    /// Bound on one notification send (milliseconds)
    pub send_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: 5_000,
            send_timeout_ms: 10_000,
        }
    }
}

impl PipelineConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Zero bounds would fail every alert
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.store_timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "store_timeout_ms must be > 0".to_string(),
            ));
        }
        if self.send_timeout_ms == 0 {
            return Err(PipelineError::InvalidConfig(
                "send_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
