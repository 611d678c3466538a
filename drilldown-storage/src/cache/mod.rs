//! Result cache with in-flight coalescing.
//!
//! [`CacheCoordinator`] answers from a TTL cache when it can. On a miss it
//! makes sure at most one producer runs per [`CacheKey`]: the first caller
//! spawns it, later callers await the same shared outcome.
//!
//! # Example
//!
//! ```ignore
//! let cache = CacheCoordinator::new(CacheConfig::from_env());
//! let key = CacheKey::for_request(&request);
//!
//! let resolution = cache
//!     .resolve_or_join(key, move || async move { produce(request).await })
//!     .await?;
//!
//! if resolution.cache_hit {
//!     tracing::debug!("served from cache");
//! }
//! ```

pub mod config;
pub mod coordinator;
pub mod key;

pub use config::CacheConfig;
pub use coordinator::{CacheCoordinator, CacheStats, CacheableResult, Resolution};
pub use key::CacheKey;
