//! Response cache configuration.

use std::{num::NonZeroUsize, time::Duration};

const DEFAULT_RESPONSE_LIMIT: usize = 200;
const DEFAULT_FALLBACK_TTL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Serve and store rendered responses.
    pub enabled: bool,
    /// Maximum number of rendered responses kept in memory.
    pub response_limit: usize,
    /// Age after which a stored response is considered stale. Zero keeps
    /// entries until they are invalidated or evicted.
    pub fallback_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            fallback_ttl_secs: DEFAULT_FALLBACK_TTL_SECS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            response_limit: settings.response_limit,
            fallback_ttl_secs: settings.fallback_ttl.map_or(0, |ttl| ttl.as_secs()),
        }
    }
}

impl CacheConfig {
    /// Returns the response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn fallback_ttl(&self) -> Option<Duration> {
        (self.fallback_ttl_secs > 0).then(|| Duration::from_secs(self.fallback_ttl_secs))
    }
}
