//! Tracing subscriber setup

use tracing_subscriber::FmtSubscriber;

use crate::config::{ConfigError, LoggingConfig};

/// Install the global subscriber.
///
/// Fails instead of panicking if a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = config.max_level()?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    installed.map_err(|e| ConfigError::Invalid(format!("logging already initialized: {e}")))
}
