//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Limits the credential endpoints per peer IP using tower_governor.
//! Uses the Generic Cell Rate Algorithm (GCRA) for efficient,
//! accurate rate enforcement without background processes.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tracing::warn;

/// Type alias for the governor config with default settings
/// StateInformationMiddleware is used when use_headers() is called to add X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Apply the limiter at all. Requires peer addresses from
    /// `into_make_service_with_connect_info`.
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 2,  // Replenish every 2 seconds
            burst_size: 5,  // Allow burst of 5
        }
    }
}

impl RateLimitConfig {
    /// Create a strict config for sensitive endpoints
    pub fn strict() -> Self {
        Self {
            enabled: true,
            per_second: 4,  // One request every 4 seconds
            burst_size: 2,
        }
    }

    /// No limiting
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Create a rate limiting governor config.
///
/// Returns `None` when limiting is disabled or the quota is zero.
/// Adds X-RateLimit-* headers to responses for quota visibility.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    if !config.enabled {
        return None;
    }
    let governor = GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers() // Adds X-RateLimit-After, X-RateLimit-Limit, X-RateLimit-Remaining
        .finish();
    if governor.is_none() {
        warn!(?config, "Invalid rate limit quota; limiter disabled");
    }
    governor.map(Arc::new)
}
