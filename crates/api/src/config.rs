//! Service configuration
//!
//! Layered with the `config` crate: an optional file, then environment
//! variables `ALERT_RELAY__<SECTION>__<KEY>`. The bare `BOT_TOKEN` and
//! `chat_id` variables of older deployments fill Telegram fields that are
//! still empty.

use ingest::PipelineConfig;
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

use crate::rate_limit::RateLimitConfig;

/// Variable naming the config file
pub const CONFIG_PATH_ENV: &str = "ALERT_RELAY_CONFIG";
/// File looked up when `ALERT_RELAY_CONFIG` is unset (any supported extension)
pub const DEFAULT_CONFIG_FILE: &str = "alert-relay";
/// Prefix of layered environment overrides
pub const ENV_PREFIX: &str = "ALERT_RELAY";

const LEGACY_TOKEN_ENV: &str = "BOT_TOKEN";
const LEGACY_CHAT_ID_ENVS: [&str; 2] = ["chat_id", "CHAT_ID"];

/// Configuration errors; all of them are fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub telegram: TelegramConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub rate_limit: RateLimitConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `<team>/<severity>.json`
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "alerts".to_string(),
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Chat that receives every notification
    pub chat_id: String,
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: notifier::telegram::DEFAULT_API_BASE.to_string(),
        }
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.bot_token.is_empty() { "" } else { "***" };
        f.debug_struct("TelegramConfig")
            .field("bot_token", &token)
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level {:?}", self.level)))
    }
}

impl AppConfig {
    /// Load from the file named by `ALERT_RELAY_CONFIG` (required when set,
    /// optional `alert-relay.*` otherwise) and the process environment,
    /// then validate.
    pub fn load() -> Result<Self, ConfigError> {
        let (path, required) = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_FILE.to_string(), false),
        };

        let mut config = Self::from_sources(&path, required)?;
        config.apply_legacy_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read one config file layered under `ALERT_RELAY__*` variables
    pub fn from_sources(path: &str, required: bool) -> Result<Self, ConfigError> {
        Self::layered(path, required, None)
    }

    /// `env` replaces the process environment when given
    fn layered(
        path: &str,
        required: bool,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(required))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Fill empty Telegram fields from the pre-layered variable names
    pub fn apply_legacy_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.telegram.bot_token.is_empty() {
            if let Some(token) = lookup(LEGACY_TOKEN_ENV) {
                self.telegram.bot_token = token;
            }
        }
        if self.telegram.chat_id.is_empty() {
            if let Some(chat_id) = LEGACY_CHAT_ID_ENVS.iter().find_map(|&name| lookup(name)) {
                self.telegram.chat_id = chat_id;
            }
        }
    }

    /// Check everything the service needs before it binds
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.telegram.chat_id.trim().is_empty() {
            return Err(ConfigError::Missing("telegram.chat_id"));
        }
        if self.storage.root.trim().is_empty() {
            return Err(ConfigError::Missing("storage.root"));
        }

        self.bind_addr()?;
        self.logging.max_level()?;
        self.pipeline
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let rate_limit = &self.server.rate_limit;
        if rate_limit.enabled && (rate_limit.replenish_secs == 0 || rate_limit.burst_size == 0) {
            return Err(ConfigError::Invalid(
                "server.rate_limit needs non-zero replenish_secs and burst_size".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind_addr.parse().map_err(|e| {
            ConfigError::Invalid(format!("server.bind_addr {:?}: {e}", self.server.bind_addr))
        })
    }
}
