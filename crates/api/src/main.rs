//! Alert Relay - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppConfig};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("invalid configuration")?;
    init_logging(&config.logging)?;

    info!("=== Alert Relay v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Storage root: {}, chat: {}", config.storage.root, config.telegram.chat_id);

    run_server(config).await
}
