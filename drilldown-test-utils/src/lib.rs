//! DRILLDOWN Test Utilities
//!
//! Shared test infrastructure for the drilldown workspace:
//! - A scripted options source standing in for the generative backend
//! - Proptest generators for raw request bodies and upstream payloads
//! - Fixtures for common requests and payloads
//! - Assertions for result invariants

pub use drilldown_core::{
    Domain, NavigationRequest, OptionsResult, PathStep, RawNavigationRequest, RawPayload,
    UpstreamError,
};
pub use drilldown_llm::OptionsSource;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// SCRIPTED SOURCE
// ============================================================================

/// One scripted reaction to a fetch.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Return this JSON as the raw payload.
    Payload(Value),
    /// Fail with this upstream error.
    Error(UpstreamError),
    /// Panic inside the fetch.
    Panic,
}

/// Options source that replays scripted responses and counts calls.
///
/// Responses are consumed in order; the last one repeats forever.
#[derive(Debug)]
pub struct ScriptedOptionsSource {
    id: String,
    script: Mutex<VecDeque<ScriptedResponse>>,
    last: Mutex<ScriptedResponse>,
    delay: Option<Duration>,
    configured: bool,
    calls: AtomicUsize,
}

impl ScriptedOptionsSource {
    /// Source that answers every fetch the same way.
    pub fn always(response: ScriptedResponse) -> Self {
        Self::sequence(vec![response])
    }

    /// Source that answers with `responses` in order.
    /// An empty script answers with `EmptyOutput`.
    pub fn sequence(responses: Vec<ScriptedResponse>) -> Self {
        let mut script: VecDeque<ScriptedResponse> = responses.into();
        let last = script
            .pop_back()
            .unwrap_or(ScriptedResponse::Error(UpstreamError::empty_output()));
        Self {
            id: "scripted".to_string(),
            script: Mutex::new(script),
            last: Mutex::new(last),
            delay: None,
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep this long (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Report the source as lacking a credential.
    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> ScriptedResponse {
        let mut script = self.script.lock().unwrap_or_else(|e| e.into_inner());
        match script.pop_front() {
            Some(response) => response,
            None => self.last.lock().unwrap_or_else(|e| e.into_inner()).clone(),
        }
    }
}

#[async_trait]
impl OptionsSource for ScriptedOptionsSource {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn fetch(&self, _request: &NavigationRequest) -> Result<RawPayload, UpstreamError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match response {
            ScriptedResponse::Payload(value) => Ok(RawPayload::new(value)),
            ScriptedResponse::Error(err) => Err(err),
            ScriptedResponse::Panic => panic!("scripted source panic"),
        }
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for untrusted inputs.

    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    /// Any JSON scalar, including wrong-typed junk.
    pub fn arb_scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            (-100.0f64..100.0).prop_map(|n| json!(n)),
            "[a-zA-Z0-9 _-]{0,24}".prop_map(Value::String),
        ]
    }

    /// A `level0` value: usually a known domain, sometimes junk.
    pub fn arb_level0() -> impl Strategy<Value = Value> {
        prop_oneof![
            3 => prop::sample::select(Domain::ALL.to_vec())
                .prop_map(|d| Value::String(d.as_str().to_string())),
            1 => arb_scalar(),
        ]
    }

    /// One path entry in any of the shapes callers send.
    pub fn arb_path_entry() -> impl Strategy<Value = Value> {
        prop_oneof![
            "[a-z]{1,12}".prop_map(Value::String),
            ("[a-z0-9-]{0,12}", "[A-Za-z ]{0,16}")
                .prop_map(|(id, label)| json!({"id": id, "label": label})),
            arb_scalar(),
        ]
    }

    /// A full raw request body.
    pub fn arb_raw_request() -> impl Strategy<Value = RawNavigationRequest> {
        (
            arb_level0(),
            prop_oneof![
                3 => prop::collection::vec(arb_path_entry(), 0..6).prop_map(Value::Array),
                1 => arb_scalar(),
            ],
            prop_oneof![
                (0u32..80).prop_map(|n| json!(n)),
                "[0-9]{1,3}".prop_map(Value::String),
                arb_scalar(),
            ],
        )
            .prop_map(|(level0, path, max_options)| RawNavigationRequest {
                level0,
                path,
                max_options,
            })
    }

    /// One option object with some fields missing or mistyped.
    pub fn arb_option_value() -> impl Strategy<Value = Value> {
        (
            prop_oneof![3 => "[a-z0-9-]{0,10}".prop_map(Value::String), 1 => arb_scalar()],
            prop_oneof![3 => "[A-Za-z ]{0,20}".prop_map(Value::String), 1 => arb_scalar()],
            prop::option::of("[A-Za-z ]{0,30}"),
            prop::option::of(-1.0f64..2.0),
        )
            .prop_map(|(id, label, description, confidence)| {
                let mut option = json!({"id": id, "label": label});
                if let Some(description) = description {
                    option["description"] = json!(description);
                }
                if let Some(confidence) = confidence {
                    option["confidence"] = json!(confidence);
                }
                option
            })
    }

    /// A payload as a model might return it, including broken ones.
    pub fn arb_raw_payload() -> impl Strategy<Value = RawPayload> {
        let buckets = prop::collection::vec(
            (
                prop::option::of("[A-Za-z ]{0,12}"),
                prop::collection::vec("[a-z0-9-]{0,10}", 0..6),
            )
                .prop_map(|(label, ids)| json!({"label": label, "option_ids": ids})),
            0..5,
        );
        prop_oneof![
            4 => (prop::collection::vec(arb_option_value(), 0..20), buckets)
                .prop_map(|(options, buckets)| json!({"options": options, "buckets": buckets})),
            1 => arb_scalar(),
        ]
        .prop_map(RawPayload::new)
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built requests and payloads.

    use super::*;
    use serde_json::json;

    /// A canonical request with bare-string path steps.
    pub fn request(domain: Domain, path: &[&str], max_options: u32) -> NavigationRequest {
        let steps = path
            .iter()
            .filter_map(|step| PathStep::new(step, step))
            .collect();
        NavigationRequest::new(domain, steps, max_options)
    }

    /// A well-formed payload with `count` options split into two buckets.
    pub fn valid_payload(count: usize) -> Value {
        let options: Vec<Value> = (1..=count)
            .map(|i| {
                json!({
                    "id": format!("opt-{}", i),
                    "label": format!("Option {}", i),
                    "description": format!("Scripted option number {}.", i),
                    "split_dimension": if i % 2 == 0 { "even" } else { "odd" },
                    "confidence": 0.8,
                })
            })
            .collect();
        let ids = |parity: usize| -> Vec<String> {
            (1..=count)
                .filter(|i| i % 2 == parity)
                .map(|i| format!("opt-{}", i))
                .collect()
        };
        json!({
            "options": options,
            "buckets": [
                {"label": "Odd", "option_ids": ids(1)},
                {"label": "Even", "option_ids": ids(0)},
            ],
            "can_confirm_here": false,
            "confirm_reason": "Keep narrowing.",
        })
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over caller-visible results.

    use super::*;
    use std::collections::HashSet;

    /// Assert every structural invariant of a result.
    #[track_caller]
    pub fn assert_result_invariants(result: &OptionsResult, max_options: u32) {
        let violations = result.invariant_violations(max_options);
        assert!(violations.is_empty(), "invariants broken: {:?}", violations);

        let ids: HashSet<&str> = result.options.iter().map(|o| o.id.as_str()).collect();
        for bucket in &result.buckets {
            for id in &bucket.option_ids {
                assert!(ids.contains(id.as_str()), "bucket references unknown id '{}'", id);
            }
        }
    }

    /// Assert a result is the stub fallback with a warning containing `needle`.
    #[track_caller]
    pub fn assert_stub_with_warning(result: &OptionsResult, needle: &str) {
        assert!(result.is_stub(), "expected stub, got {:?}", result.mode);
        assert!(
            result.warnings.iter().any(|w| w.contains(needle)),
            "no warning containing '{}' in {:?}",
            needle,
            result.warnings
        );
    }
}

pub use assertions::*;
pub use fixtures::*;
pub use generators::*;
