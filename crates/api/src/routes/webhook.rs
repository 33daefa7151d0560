//! Alertmanager Webhook Route

use alerting::AlertBatch;
use axum::{body::Bytes, extract::State, http::header, http::HeaderMap, Json};
use ingest::BatchResult;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

pub const NO_ALERTS: &str = "No alerts to process";
pub const PROCESSED: &str = "Alerts processed successfully";
pub const PROCESSED_WITH_ERRORS: &str = "Alerts processed with errors";

/// Response for the webhook endpoint
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub result: BatchResult,
}

/// Receive one alert batch.
///
/// Per-alert failures still answer 200 with the failures listed; only a
/// wrong content type or an unreadable body rejects the whole request.
pub async fn receive_alerts(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    if !is_json(&headers) {
        return Err(ApiError::UnsupportedContentType);
    }

    let batch = AlertBatch::from_slice(&body)?;
    info!("Received batch with {} alerts", batch.len());

    let result = state.pipeline.process(&batch).await;
    let message = if batch.is_empty() {
        NO_ALERTS
    } else if result.is_clean() {
        PROCESSED
    } else {
        PROCESSED_WITH_ERRORS
    };

    Ok(Json(WebhookResponse { message, result }))
}

/// `application/json` or any `application/*+json`, parameters ignored
fn is_json(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };

    let mime = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json(&with_type("application/json")));
        assert!(is_json(&with_type("application/json; charset=utf-8")));
        assert!(is_json(&with_type("Application/JSON")));
        assert!(is_json(&with_type("application/vnd.alertmanager+json")));
    }

    #[test]
    fn test_non_json_content_types() {
        assert!(!is_json(&HeaderMap::new()));
        assert!(!is_json(&with_type("text/plain")));
        assert!(!is_json(&with_type("application/x-www-form-urlencoded")));
        assert!(!is_json(&with_type("text/json+xml")));
    }
}
