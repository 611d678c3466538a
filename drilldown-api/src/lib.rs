//! DRILLDOWN API - HTTP Layer and Request Resolver
//!
//! Exposes the navigation options endpoint over Axum. Each request is
//! sanitized, answered from the shared cache when possible, and otherwise
//! fetched from the generative backend through a single-flight coordinator.
//! Upstream trouble never surfaces as a 5xx: it degrades to stub results.

pub mod config;
pub mod error;
pub mod resolver;
pub mod routes;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, ResolverConfig};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use resolver::OptionsResolver;
pub use routes::{create_router, AppState};
