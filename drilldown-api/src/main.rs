//! DRILLDOWN API Server Entry Point
//!
//! Bootstraps configuration from the environment and starts the Axum HTTP
//! server.

use std::sync::Arc;

use axum::Router;
use drilldown_api::{create_router, ApiConfig, ApiError, ApiResult, OptionsResolver, ResolverConfig};
use drilldown_llm::{OpenAiOptionsSource, OptionsSource};
use drilldown_storage::{CacheConfig, CacheCoordinator};

use drilldown_api::telemetry::{init_tracing, TelemetryConfig, METRICS};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracing(&telemetry_config)?;

    if let Err(e) = METRICS.as_ref() {
        tracing::warn!(error = %e, "Metrics unavailable");
    }

    let source = OpenAiOptionsSource::from_env()?;
    if !source.is_configured() {
        tracing::warn!("OPENAI_API_KEY not set; every request will be served from the stub fallback");
    }
    tracing::info!(model = source.model(), "Options source ready");

    let cache_config = CacheConfig::from_env();
    tracing::info!(
        ttl_secs = cache_config.entry_ttl.as_secs(),
        stub_ttl_secs = cache_config.degraded_ttl.as_secs(),
        max_entries = cache_config.max_entries,
        "Cache configured"
    );

    let resolver = Arc::new(OptionsResolver::new(
        Arc::new(source),
        CacheCoordinator::new(cache_config),
        ResolverConfig::from_env(),
    ));

    let api_config = ApiConfig::from_env();
    let app: Router = create_router(resolver, &api_config);

    let addr = api_config.bind_addr()?;
    tracing::info!(%addr, "Starting DRILLDOWN API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    let server = axum::serve(listener, app);
    tokio::select! {
        result = server => {
            result.map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
