//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP limits on the read API via tower_governor. Requires the
//! service to run with `into_make_service_with_connect_info::<SocketAddr>()`.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::config::ConfigError;

/// Governor config with X-RateLimit-* headers enabled
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether the limiter is installed at all
    pub enabled: bool,
    /// Seconds to replenish one request of quota
    pub replenish_secs: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            replenish_secs: 2,
            burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Build the governor config for `GovernorLayer`.
///
/// Zero quotas are refused by governor and reported as invalid config.
pub fn create_governor_config(
    config: &RateLimitConfig,
) -> Result<Arc<DefaultGovernorConfig>, ConfigError> {
    GovernorConfigBuilder::default()
        .per_second(config.replenish_secs)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
        .ok_or_else(|| {
            ConfigError::Invalid(format!(
                "rate limit needs non-zero replenish_secs and burst_size, got {} and {}",
                config.replenish_secs, config.burst_size
            ))
        })
}
