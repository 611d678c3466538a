//! Cache configuration.

use std::time::Duration;

/// Configuration for the result cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL for results produced by the model.
    pub entry_ttl: Duration,
    /// TTL for degraded (stub) results.
    pub degraded_ttl: Duration,
    /// Maximum number of entries kept; oldest inserted are evicted first.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            entry_ttl: Duration::from_secs(600),
            degraded_ttl: Duration::from_secs(60),
            max_entries: 500,
        }
    }
}

impl CacheConfig {
    /// Create a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `DRILLDOWN_CACHE_TTL_SECS`, `DRILLDOWN_STUB_TTL_SECS` and
    /// `DRILLDOWN_CACHE_CAPACITY`; unparseable values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |name: &str, default: Duration| {
            std::env::var(name)
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Self {
            entry_ttl: secs("DRILLDOWN_CACHE_TTL_SECS", defaults.entry_ttl),
            degraded_ttl: secs("DRILLDOWN_STUB_TTL_SECS", defaults.degraded_ttl),
            max_entries: std::env::var("DRILLDOWN_CACHE_CAPACITY")
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_entries),
        }
    }

    /// Set the TTL for model results.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.entry_ttl = ttl;
        self
    }

    /// Set the TTL for degraded results.
    pub fn with_degraded_ttl(mut self, ttl: Duration) -> Self {
        self.degraded_ttl = ttl;
        self
    }

    /// Set the capacity.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn ttl_for(&self, degraded: bool) -> Duration {
        if degraded {
            self.degraded_ttl
        } else {
            self.entry_ttl
        }
    }
}
