//! Request resolution pipeline.
//!
//! sanitize -> cache lookup -> (hit | join | fetch) -> normalize or fall back
//! -> store -> annotate meta.
//!
//! Only sanitization can fail. Every upstream problem, including timeouts
//! and a panicking source, ends as a stub result with a warning.

use std::sync::Arc;
use std::time::{Duration, Instant};

use drilldown_core::{
    fallback_result, normalize, sanitize, InputError, NavigationRequest, Normalized,
    OptionsResult, RawNavigationRequest, ResultMeta, UpstreamError,
};
use drilldown_llm::OptionsSource;
use drilldown_storage::{CacheCoordinator, CacheKey};

use crate::config::ResolverConfig;
use crate::telemetry::metrics;

/// Orchestrates one navigation request end to end.
#[derive(Clone)]
pub struct OptionsResolver {
    source: Arc<dyn OptionsSource>,
    cache: CacheCoordinator<OptionsResult>,
    config: ResolverConfig,
}

impl OptionsResolver {
    pub fn new(
        source: Arc<dyn OptionsSource>,
        cache: CacheCoordinator<OptionsResult>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &CacheCoordinator<OptionsResult> {
        &self.cache
    }

    pub fn source(&self) -> &dyn OptionsSource {
        self.source.as_ref()
    }

    /// Resolve a raw request body.
    ///
    /// # Errors
    /// Only [`InputError`]; the cache is not touched in that case.
    pub async fn resolve(&self, raw: &RawNavigationRequest) -> Result<OptionsResult, InputError> {
        let started = Instant::now();
        let request = sanitize(raw)?;
        Ok(self.resolve_request(request, started).await)
    }

    #[tracing::instrument(
        name = "resolve",
        skip_all,
        fields(
            level0 = %request.domain(),
            depth = request.depth(),
            max_options = request.max_options(),
        )
    )]
    async fn resolve_request(&self, request: NavigationRequest, started: Instant) -> OptionsResult {
        let key = CacheKey::for_request(&request);
        let source = Arc::clone(&self.source);
        let timeout = self.config.upstream_timeout;
        let producer_request = request.clone();

        let resolution = self
            .cache
            .resolve_or_join(key, move || produce(source, producer_request, timeout))
            .await;

        let (mut result, cache_hit, coalesced) = match resolution {
            Ok(resolution) => (resolution.value, resolution.cache_hit, resolution.coalesced),
            Err(err) => {
                tracing::error!(error = %err, "shared fetch failed; serving fallback");
                let warnings = vec![format!("options fetch aborted: {}", err)];
                let result = fallback_result(
                    request.domain(),
                    request.path(),
                    request.max_options(),
                    warnings,
                );
                (result, false, false)
            }
        };

        let outcome = if cache_hit {
            "cache_hit"
        } else if coalesced {
            "joined"
        } else if result.is_stub() {
            "stub"
        } else {
            "llm"
        };
        if let Some(metrics) = metrics() {
            metrics.record_resolution(outcome);
            metrics.set_cache_entries(self.cache.len());
        }

        result.meta = ResultMeta {
            cache_hit,
            coalesced,
            requested_max: request.max_options(),
            returned_count: result.options.len(),
            latency_ms: started.elapsed().as_millis() as u64,
            ..ResultMeta::default()
        };

        tracing::debug!(
            outcome,
            mode = ?result.mode,
            returned = result.options.len(),
            latency_ms = result.meta.latency_ms,
            "request resolved"
        );
        result
    }
}

impl std::fmt::Debug for OptionsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsResolver")
            .field("source", &self.source.source_id())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

/// Run one upstream fetch and turn its outcome into a result.
/// Never fails: anything unusable becomes a fallback.
async fn produce(
    source: Arc<dyn OptionsSource>,
    request: NavigationRequest,
    timeout: Duration,
) -> OptionsResult {
    let started = Instant::now();
    let fetched = match tokio::time::timeout(timeout, source.fetch(&request)).await {
        Ok(fetched) => fetched,
        Err(_) => Err(UpstreamError::transport(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    };
    let elapsed = started.elapsed().as_secs_f64();
    let source_id = source.source_id();

    let fallback = |warnings: Vec<String>| {
        fallback_result(
            request.domain(),
            request.path(),
            request.max_options(),
            warnings,
        )
    };

    match fetched {
        Ok(payload) => match normalize(&payload, &request) {
            Normalized::Valid(result) => {
                if let Some(metrics) = metrics() {
                    metrics.record_upstream(source_id, None, elapsed);
                }
                result
            }
            Normalized::Invalid(reasons) => {
                tracing::warn!(
                    source = source_id,
                    reasons = ?reasons,
                    "upstream payload unusable; serving fallback"
                );
                if let Some(metrics) = metrics() {
                    metrics.record_upstream(source_id, Some("invalid_payload"), elapsed);
                }
                fallback(vec![format!(
                    "upstream payload unusable: {}",
                    reasons.join("; ")
                )])
            }
        },
        Err(err) => {
            tracing::warn!(
                source = source_id,
                kind = %err.kind,
                details = %err.details,
                "upstream fetch failed; serving fallback"
            );
            if let Some(metrics) = metrics() {
                metrics.record_upstream(source_id, Some(err.kind.metric_label()), elapsed);
            }
            fallback(vec![err.to_warning()])
        }
    }
}
