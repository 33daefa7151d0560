//! Notification sinks for persisted alerts.
//!
//! The ingestion pipeline only knows the [`NotificationSink`] trait: deliver
//! a text to a destination, succeed or fail. [`TelegramSink`] is the
//! production implementation backed by the Telegram Bot API.

pub mod error;
pub mod telegram;

pub use error::SendError;
pub use telegram::TelegramSink;

use async_trait::async_trait;

/// Delivers notification text to an external destination.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Get the name of this sink.
    fn name(&self) -> &'static str;

    /// Send `text` to `destination` (a chat id for Telegram).
    async fn send(&self, destination: &str, text: &str) -> Result<(), SendError>;
}
