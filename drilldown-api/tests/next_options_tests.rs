//! Router-level tests for the DRILLDOWN API

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use drilldown_api::{create_router, ApiConfig, OptionsResolver, ResolverConfig};
use drilldown_core::{UpstreamError, ALL_OPTIONS_BUCKET, STUB_WARNING};
use drilldown_llm::{OpenAiConfig, OpenAiOptionsSource, OptionsSource};
use drilldown_storage::{CacheConfig, CacheCoordinator};
use drilldown_test_utils::{
    assert_result_invariants, assert_stub_with_warning, valid_payload, OptionsResult,
    ScriptedOptionsSource, ScriptedResponse,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    resolver: Arc<OptionsResolver>,
}

fn app_with(source: Arc<dyn OptionsSource>) -> TestApp {
    let resolver = Arc::new(OptionsResolver::new(
        source,
        CacheCoordinator::new(CacheConfig::default()),
        ResolverConfig::default().with_upstream_timeout(Duration::from_secs(2)),
    ));
    TestApp {
        router: create_router(Arc::clone(&resolver), &ApiConfig::default()),
        resolver,
    }
}

fn keyless_app() -> Result<TestApp, String> {
    let source = OpenAiOptionsSource::new(&OpenAiConfig::default()).map_err(|e| e.to_string())?;
    Ok(app_with(Arc::new(source)))
}

fn scripted_app(response: ScriptedResponse) -> (TestApp, Arc<ScriptedOptionsSource>) {
    let source = Arc::new(ScriptedOptionsSource::always(response));
    (app_with(Arc::clone(&source) as Arc<dyn OptionsSource>), source)
}

struct TestResponse {
    status: StatusCode,
    headers: axum::http::HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Result<Value, String> {
        serde_json::from_slice(&self.body).map_err(|e| format!("body is not JSON: {}", e))
    }

    fn result(&self) -> Result<OptionsResult, String> {
        serde_json::from_slice(&self.body).map_err(|e| format!("body is not a result: {}", e))
    }
}

async fn send(router: &Router, method: Method, uri: &str, body: Body) -> Result<TestResponse, String> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .map_err(|e| e.to_string())?;
    let response = router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| e.to_string())?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    Ok(TestResponse {
        status,
        headers,
        body: body.to_vec(),
    })
}

async fn post_json(router: &Router, uri: &str, body: Value) -> Result<TestResponse, String> {
    send(router, Method::POST, uri, Body::from(body.to_string())).await
}

// ============================================================================
// NEXT OPTIONS
// ============================================================================

#[tokio::test]
async fn test_keyless_services_root_serves_stub() -> Result<(), String> {
    let app = keyless_app()?;
    let response = post_json(&app.router, "/next-options", json!({"level0": "services"})).await?;

    assert_eq!(response.status, StatusCode::OK);
    let result = response.result()?;
    assert!(result.is_stub());
    assert_eq!(result.options.len(), 10);
    assert_eq!(result.buckets.len(), 1);
    assert_eq!(result.buckets[0].label, ALL_OPTIONS_BUCKET);
    assert_eq!(result.buckets[0].option_ids.len(), 10);
    assert!(!result.can_confirm_here);
    assert_stub_with_warning(&result, "no_credential");
    assert_eq!(result.warnings.last().map(String::as_str), Some(STUB_WARNING));
    assert_result_invariants(&result, 10);

    let body = response.json()?;
    assert_eq!(body["mode"], "stub");
    assert_eq!(body["step"]["level0"], "services");
    Ok(())
}

#[tokio::test]
async fn test_two_step_path_allows_confirmation() -> Result<(), String> {
    let app = keyless_app()?;
    let body = json!({
        "level0": "physical-products",
        "path": [{"id": "food", "label": "Food"}, "snacks"],
    });
    let response = post_json(&app.router, "/api/v1/next-options", body).await?;

    assert_eq!(response.status, StatusCode::OK);
    let result = response.result()?;
    assert!(result.can_confirm_here);
    assert_eq!(result.step.path_labels, vec!["Food", "snacks"]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_domain_is_rejected_without_caching() -> Result<(), String> {
    let (app, source) = scripted_app(ScriptedResponse::Payload(valid_payload(10)));
    let before = app.resolver.cache().len();

    let response = post_json(&app.router, "/next-options", json!({"level0": "bogus"})).await?;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json()?;
    assert_eq!(body["code"], "INVALID_DOMAIN");
    assert!(body["error"].as_str().is_some_and(|e| e.contains("bogus")));
    assert_eq!(app.resolver.cache().len(), before);
    assert_eq!(source.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_unparseable_body_is_bad_request() -> Result<(), String> {
    let app = keyless_app()?;
    for body in ["{not json", "[1, 2]", ""] {
        let response = send(&app.router, Method::POST, "/next-options", Body::from(body)).await?;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "body {:?}", body);
        let json = response.json()?;
        assert_eq!(json["code"], "MALFORMED_BODY");
        assert!(json["error"].is_string());
    }
    Ok(())
}

#[tokio::test]
async fn test_repeat_request_hits_cache() -> Result<(), String> {
    let (app, source) = scripted_app(ScriptedResponse::Payload(valid_payload(10)));
    let body = json!({"level0": "entertainment", "path": ["music"], "max_options": 10});

    let first = post_json(&app.router, "/next-options", body.clone()).await?.result()?;
    let second = post_json(&app.router, "/next-options", body).await?.result()?;

    assert!(!first.meta.cache_hit);
    assert!(second.meta.cache_hit);
    assert_eq!(first.options, second.options);
    assert_eq!(source.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_share_one_fetch() -> Result<(), String> {
    let source = Arc::new(
        ScriptedOptionsSource::always(ScriptedResponse::Payload(valid_payload(10)))
            .with_delay(Duration::from_millis(150)),
    );
    let app = app_with(Arc::clone(&source) as Arc<dyn OptionsSource>);
    let body = json!({"level0": "services", "path": ["cleaning"]});

    let responses = futures_util::future::join_all(
        (0..6).map(|_| post_json(&app.router, "/next-options", body.clone())),
    )
    .await;

    assert_eq!(source.calls(), 1);
    let mut results = Vec::new();
    for response in responses {
        results.push(response?.result()?);
    }
    assert_eq!(results[0].options.len(), 10);
    assert!(results.iter().all(|r| r.options == results[0].options));
    Ok(())
}

#[tokio::test]
async fn test_llm_result_passes_through() -> Result<(), String> {
    let (app, _source) = scripted_app(ScriptedResponse::Payload(valid_payload(12)));
    let response = post_json(
        &app.router,
        "/next-options",
        json!({"level0": "services", "max_options": "8"}),
    )
    .await?;

    let result = response.result()?;
    assert_eq!(response.json()?["mode"], "llm");
    assert_eq!(result.options.len(), 8);
    assert_eq!(result.meta.requested_max, 8);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.contains("truncated options from 12 to 8")));
    assert_result_invariants(&result, 8);
    Ok(())
}

#[tokio::test]
async fn test_every_failure_kind_serves_stub() -> Result<(), String> {
    let cases = vec![
        (ScriptedResponse::Error(UpstreamError::transport("refused")), "transport_error"),
        (ScriptedResponse::Error(UpstreamError::http(429, "slow down")), "http_429"),
        (ScriptedResponse::Error(UpstreamError::empty_output()), "empty_output"),
        (ScriptedResponse::Error(UpstreamError::malformed_json("prose")), "malformed_json"),
        (ScriptedResponse::Payload(json!({"options": []})), "upstream payload unusable"),
        (ScriptedResponse::Panic, "aborted"),
    ];

    for (response, needle) in cases {
        let (app, _source) = scripted_app(response);
        let reply = post_json(&app.router, "/next-options", json!({"level0": "services"})).await?;
        assert_eq!(reply.status, StatusCode::OK, "{}", needle);
        let result = reply.result()?;
        assert!(!result.options.is_empty(), "{}", needle);
        assert_stub_with_warning(&result, needle);
    }
    Ok(())
}

#[tokio::test]
async fn test_slow_upstream_serves_stub() -> Result<(), String> {
    let source = Arc::new(
        ScriptedOptionsSource::always(ScriptedResponse::Payload(valid_payload(10)))
            .with_delay(Duration::from_secs(30)),
    );
    let resolver = Arc::new(OptionsResolver::new(
        Arc::clone(&source) as Arc<dyn OptionsSource>,
        CacheCoordinator::new(CacheConfig::default()),
        ResolverConfig::default().with_upstream_timeout(Duration::from_millis(50)),
    ));
    let router = create_router(resolver, &ApiConfig::default());

    let result = post_json(&router, "/next-options", json!({"level0": "entertainment"}))
        .await?
        .result()?;
    assert_stub_with_warning(&result, "timed out");
    Ok(())
}

// ============================================================================
// CORS AND FALLBACK
// ============================================================================

#[tokio::test]
async fn test_preflight_on_any_path() -> Result<(), String> {
    let app = keyless_app()?;
    for path in ["/next-options", "/anything/at/all"] {
        let response = send(&app.router, Method::OPTIONS, path, Body::empty()).await?;
        assert_eq!(response.status, StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&header::HeaderValue::from_static("*"))
        );
        assert!(response
            .headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .is_some());
    }
    Ok(())
}

#[tokio::test]
async fn test_unknown_route_is_not_found() -> Result<(), String> {
    let app = keyless_app()?;
    let cases = [
        (Method::GET, "/next-options"),
        (Method::POST, "/next-options/extra"),
        (Method::GET, "/nowhere"),
        (Method::POST, "/health/ping"),
    ];
    for (method, path) in cases {
        let response = send(&app.router, method.clone(), path, Body::empty()).await?;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{} {}", method, path);
        assert_eq!(response.json()?["error"], "not_found");
        assert!(response.headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_some());
    }
    Ok(())
}

#[tokio::test]
async fn test_request_id_header_present() -> Result<(), String> {
    let app = keyless_app()?;
    let response = send(&app.router, Method::GET, "/health/ping", Body::empty()).await?;
    assert!(response.headers.get("x-request-id").is_some());
    Ok(())
}

// ============================================================================
// HEALTH AND METRICS
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() -> Result<(), String> {
    let app = keyless_app()?;

    let ping = send(&app.router, Method::GET, "/health/ping", Body::empty()).await?;
    assert_eq!(ping.status, StatusCode::OK);
    assert_eq!(ping.body, b"pong");

    let live = send(&app.router, Method::GET, "/health/live", Body::empty()).await?;
    assert_eq!(live.json()?["status"], "healthy");

    let ready = send(&app.router, Method::GET, "/health/ready", Body::empty()).await?;
    assert_eq!(ready.status, StatusCode::OK);
    let body = ready.json()?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["upstream"]["source"], "openai");
    assert_eq!(body["details"]["cache"]["entries"], 0);
    Ok(())
}

#[tokio::test]
async fn test_ready_is_healthy_with_configured_source() -> Result<(), String> {
    let (app, _source) = scripted_app(ScriptedResponse::Payload(valid_payload(10)));
    let ready = send(&app.router, Method::GET, "/health/ready", Body::empty()).await?;
    assert_eq!(ready.json()?["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_renders_text() -> Result<(), String> {
    let app = keyless_app()?;
    post_json(&app.router, "/next-options", json!({"level0": "services"})).await?;

    let response = send(&app.router, Method::GET, "/metrics", Body::empty()).await?;
    assert_eq!(response.status, StatusCode::OK);
    let text = String::from_utf8(response.body).map_err(|e| e.to_string())?;
    assert!(text.contains("drilldown_resolutions_total"));
    assert!(text.contains("drilldown_http_requests_total"));
    Ok(())
}

#[tokio::test]
async fn test_ready_reports_unconfigured_source_as_degraded() -> Result<(), String> {
    let source = Arc::new(
        ScriptedOptionsSource::always(ScriptedResponse::Error(UpstreamError::no_credential()))
            .unconfigured(),
    );
    let app = app_with(source as Arc<dyn OptionsSource>);
    let body = send(&app.router, Method::GET, "/health/ready", Body::empty())
        .await?
        .json()?;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["details"]["upstream"]["source"], "scripted");
    assert!(body["details"]["upstream"]["error"].is_string());
    Ok(())
}
