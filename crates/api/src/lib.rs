//! Alert Relay API Server
//!
//! Receives Alertmanager webhooks, persists each routed alert into its
//! per-team/per-severity log and relays it to Telegram.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use ingest::IngestionPipeline;
use notifier::TelegramSink;
use rate_limit::DefaultGovernorConfig;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::AlertStore;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
mod error;
mod logging;
pub mod rate_limit;
mod routes;


pub use config::{AppConfig, ConfigError};
pub use error::ApiError;
pub use logging::init_logging;

/// Application state shared across handlers
pub struct AppState {
    /// Ingestion pipeline (owns the store and the sink)
    pub pipeline: IngestionPipeline,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(pipeline: IngestionPipeline) -> Self {
        Self {
            pipeline,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    /// Wire store, Telegram sink and pipeline from validated config
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(AlertStore::new(&config.storage.root));
        let sink = TelegramSink::with_api_base(&config.telegram.bot_token, &config.telegram.api_base)
            .context("failed to create Telegram sink")?;
        let pipeline = IngestionPipeline::new(
            store,
            Arc::new(sink),
            &config.telegram.chat_id,
            config.pipeline.clone(),
        )
        .context("failed to create ingestion pipeline")?;

        Ok(Self::new(pipeline))
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub storage_root: String,
    pub tracked_keys: usize,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    assemble_router(state, None)
}

/// Router plus request tracing and, when enabled, per-IP rate limiting of
/// the read routes. The webhook is never limited: Alertmanager does not
/// retry a 429, so a limited batch would be lost.
pub fn build_app(state: Arc<AppState>, config: &AppConfig) -> Result<Router, ConfigError> {
    let rate_limit = &config.server.rate_limit;
    let governor = if rate_limit.enabled {
        info!(
            "Rate limiting /api/v1: burst={}, replenish every {}s",
            rate_limit.burst_size, rate_limit.replenish_secs
        );
        Some(rate_limit::create_governor_config(rate_limit)?)
    } else {
        None
    };

    Ok(assemble_router(state, governor).layer(TraceLayer::new_for_http()))
}

fn assemble_router(state: Arc<AppState>, governor: Option<Arc<DefaultGovernorConfig>>) -> Router {
    let mut reads = Router::new()
        .route("/api/v1/health", get(health_handler))
        .route(
            "/api/v1/alerts/:team/:severity",
            get(routes::alerts::get_alerts),
        );
    if let Some(config) = governor {
        reads = reads.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/webhook", post(routes::webhook::receive_alerts))
        .merge(reads)
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let store = state.pipeline.store();

    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        storage_root: store.root().display().to_string(),
        tracked_keys: store.tracked_keys(),
    })
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr()?;
    let state = Arc::new(AppState::from_config(&config)?);
    let app = build_app(state, &config)?;

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
