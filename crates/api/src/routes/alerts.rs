//! Alert Log Routes

use alerting::AlertRecord;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Hard cap on records returned per request
const MAX_LIMIT: usize = 1000;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Newest first
    pub data: Vec<AlertRecord>,
    pub count: usize,
    /// Records in the whole log
    pub total: usize,
}

/// Get the most recent records of one (team, severity) log
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Path((team, severity)): Path<(String, String)>,
    Query(params): Query<AlertQuery>,
) -> Result<Json<AlertResponse>, ApiError> {
    let store = Arc::clone(state.pipeline.store());
    store
        .log_path(&team, &severity)
        .map_err(|e| ApiError::InvalidKey(e.to_string()))?;

    let limit = params.limit.min(MAX_LIMIT);
    let log = tokio::task::spawn_blocking(move || store.load(&team, &severity))
        .await
        .map_err(|e| ApiError::Internal(format!("load task failed: {e}")))??;

    let total = log.len();
    let data: Vec<_> = log.into_iter().rev().take(limit).collect();

    Ok(Json(AlertResponse {
        count: data.len(),
        total,
        data,
    }))
}
