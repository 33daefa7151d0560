//! Telegram Bot API sink.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::NotificationSink;

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Sends messages through `sendMessage` of the Telegram Bot API.
pub struct TelegramSink {
    api_base: String,
    token: String,
    client: reqwest::Client,
}

impl TelegramSink {
    /// Create a sink against the public Bot API.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::NotConfigured`] if the token is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, SendError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a sink against a custom Bot API server.
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Result<Self, SendError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SendError::NotConfigured("bot token is empty".to_string()));
        }

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }
}

impl fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramSink")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, destination: &str, text: &str) -> Result<(), SendError> {
        if destination.is_empty() {
            return Err(SendError::NotConfigured("chat id is empty".to_string()));
        }

        debug!(sink = "telegram", chat_id = %destination, "Sending notification");

        // The token is part of the URL; strip it from transport errors.
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessage {
                chat_id: destination,
                text,
            })
            .send()
            .await
            .map_err(|e| SendError::Http(e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SendError::Http(e.without_url()))?;
        let reply: Option<ApiResponse> = serde_json::from_str(&body).ok();

        if status.is_success() && reply.as_ref().is_some_and(|r| r.ok) {
            debug!(sink = "telegram", "Notification sent successfully");
            return Ok(());
        }

        if let Some(retry_after_secs) = reply
            .as_ref()
            .and_then(|r| r.parameters.as_ref())
            .and_then(|p| p.retry_after)
        {
            warn!(sink = "telegram", retry_after_secs, "Telegram rate limit hit");
            return Err(SendError::RateLimited { retry_after_secs });
        }

        let description = reply.and_then(|r| r.description).unwrap_or(body);
        warn!(
            sink = "telegram",
            status = %status,
            description = %description,
            "Telegram rejected message"
        );

        Err(SendError::Rejected {
            status: status.as_u16(),
            description,
        })
    }
}

// =============================================================================
// Bot API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}
