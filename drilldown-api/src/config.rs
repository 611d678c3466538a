//! API Configuration Module
//!
//! Configuration for CORS, the listener address and the resolver. Values are
//! loaded from environment variables with defaults suited to development.

use std::net::SocketAddr;
use std::time::Duration;

use drilldown_core::ConfigError;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// HTTP-facing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins.
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Interface to bind.
    pub bind_host: String,

    /// Port to bind, kept as text until [`ApiConfig::bind_addr`] validates it.
    pub bind_port: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_max_age_secs: 86400,
            bind_host: "0.0.0.0".to_string(),
            bind_port: "3000".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `DRILLDOWN_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `DRILLDOWN_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `DRILLDOWN_API_BIND`: Interface to bind (default: 0.0.0.0)
    /// - `PORT`, then `DRILLDOWN_API_PORT`: Port to bind (default: 3000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = std::env::var("DRILLDOWN_CORS_ORIGINS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs = std::env::var("DRILLDOWN_CORS_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.cors_max_age_secs);

        Self {
            cors_origins,
            cors_max_age_secs,
            bind_host: std::env::var("DRILLDOWN_API_BIND").unwrap_or(defaults.bind_host),
            bind_port: std::env::var("PORT")
                .ok()
                .or_else(|| std::env::var("DRILLDOWN_API_PORT").ok())
                .unwrap_or(defaults.bind_port),
        }
    }

    /// Validated socket address to listen on.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port = self
            .bind_port
            .trim()
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "PORT".to_string(),
                value: self.bind_port.clone(),
                reason: e.to_string(),
            })?;

        let addr = format!("{}:{}", self.bind_host.trim(), port);
        addr.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "DRILLDOWN_API_BIND".to_string(),
                value: addr.clone(),
                reason: e.to_string(),
            })
    }

    /// Value for `Access-Control-Allow-Origin` given the request origin.
    /// `None` means the origin is not allowed.
    pub fn allowed_origin(&self, request_origin: Option<&str>) -> Option<String> {
        if self.cors_origins.is_empty() {
            return Some("*".to_string());
        }
        request_origin
            .filter(|origin| self.cors_origins.iter().any(|o| o == origin))
            .map(str::to_string)
    }
}

// ============================================================================
// RESOLVER CONFIGURATION
// ============================================================================

/// Settings for [`OptionsResolver`](crate::resolver::OptionsResolver).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Deadline for a single upstream fetch.
    pub upstream_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            upstream_timeout: Duration::from_secs(20),
        }
    }
}

impl ResolverConfig {
    /// Load from `DRILLDOWN_UPSTREAM_TIMEOUT_SECS` (default: 20).
    pub fn from_env() -> Self {
        let upstream_timeout = std::env::var("DRILLDOWN_UPSTREAM_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or_else(|| Self::default().upstream_timeout);
        Self { upstream_timeout }
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }
}
