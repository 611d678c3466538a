//! REST API Routes Module
//!
//! - `POST */next-options` - resolve navigation options (any path prefix)
//! - Health check endpoints (Kubernetes-compatible)
//! - Prometheus metrics at `/metrics`
//! - CORS for browser clients, including `OPTIONS` preflight on any path
//!
//! Anything else is a 404 `{"code": "NOT_FOUND", "error": "not_found"}`.

pub mod health;
pub mod next_options;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderValue, Method, Uri},
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::resolver::OptionsResolver;
use crate::telemetry::{metrics_handler, observability_middleware};

const OPTIONS_SUFFIX: &str = "/next-options";
const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const DEFAULT_ALLOW_HEADERS: &str = "content-type, authorization";

// ============================================================================
// STATE
// ============================================================================

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<OptionsResolver>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(resolver: Arc<OptionsResolver>) -> Self {
        Self {
            resolver,
            start_time: Instant::now(),
        }
    }
}

// ============================================================================
// ROUTER
// ============================================================================

/// Build the full application router.
pub fn create_router(resolver: Arc<OptionsResolver>, api_config: &ApiConfig) -> Router {
    let state = AppState::new(resolver);

    if api_config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
    } else {
        tracing::info!("CORS: allowing origins: {:?}", api_config.cors_origins);
    }

    Router::new()
        .nest("/health", health::create_router())
        .route("/metrics", get(metrics_handler).fallback(not_found))
        .fallback(dispatch)
        .with_state(state)
        .layer(from_fn_with_state(Arc::new(api_config.clone()), cors_middleware))
        .layer(from_fn(observability_middleware))
        .layer(TraceLayer::new_for_http())
}

/// Catch-all: the options endpoint lives under any path prefix.
async fn dispatch(State(state): State<AppState>, method: Method, uri: Uri, body: Bytes) -> Response {
    if method == Method::POST && uri.path().ends_with(OPTIONS_SUFFIX) {
        return next_options::next_options(State(state), body)
            .await
            .into_response();
    }
    ApiError::not_found().into_response()
}

pub(crate) async fn not_found() -> ApiError {
    ApiError::not_found()
}

// ============================================================================
// CORS
// ============================================================================

/// Answer preflights with 204 on any path and tag every other response with
/// `Access-Control-Allow-Origin`.
async fn cors_middleware(
    State(config): State<Arc<ApiConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let allow_origin = config.allowed_origin(origin.as_deref());

    if request.method() == Method::OPTIONS {
        let requested_headers = request
            .headers()
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned();

        let mut response = axum::http::StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            requested_headers.unwrap_or(HeaderValue::from_static(DEFAULT_ALLOW_HEADERS)),
        );
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(config.cors_max_age_secs),
        );
        apply_allow_origin(&mut response, allow_origin.as_deref());
        return response;
    }

    let mut response = next.run(request).await;
    apply_allow_origin(&mut response, allow_origin.as_deref());
    response
}

fn apply_allow_origin(response: &mut Response, allow_origin: Option<&str>) {
    let Some(origin) = allow_origin else {
        return;
    };
    let Ok(value) = HeaderValue::from_str(origin) else {
        return;
    };
    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    if origin != "*" {
        headers.append(header::VARY, HeaderValue::from_static("origin"));
    }
}
