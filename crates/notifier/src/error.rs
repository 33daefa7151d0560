//! Error types for notification delivery.

use thiserror::Error;

/// Errors that can occur when delivering a notification.
#[derive(Debug, Error)]
pub enum SendError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Sink is missing a credential or destination
    #[error("Sink not configured: {0}")]
    NotConfigured(String),

    /// Backend answered but refused the message
    #[error("Rejected by backend (status {status}): {description}")]
    Rejected { status: u16, description: String },

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// No answer within the delivery bound
    #[error("Send timed out after {0}ms")]
    Timeout(u64),
}
