//! DRILLDOWN Storage - In-Process Result Cache
//!
//! Nothing in drilldown persists beyond the process. This crate holds the
//! only shared state: a bounded TTL cache of resolved results and the set of
//! fetches currently in flight, so identical concurrent requests share one
//! upstream call.

pub mod cache;

pub use cache::{CacheConfig, CacheCoordinator, CacheKey, CacheStats, CacheableResult, Resolution};
