//! Result types returned to callers.
//!
//! Field names follow the wire format (`level0`, `path_labels`,
//! `split_dimension`, ...), so these types serialize straight into the
//! HTTP response body.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::{ALL_OPTIONS_BUCKET, BUILD_STAMP};
use crate::domain::NavigationRequest;

/// Whether a result came from the model or the deterministic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    Llm,
    Stub,
}

/// A candidate next-level sub-category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionItem {
    pub id: String,
    pub label: String,
    pub description: String,
    pub split_dimension: String,
    pub confidence: f64,
}

/// A named grouping of options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub option_ids: Vec<String>,
}

impl Bucket {
    /// Catch-all bucket listing every option in order.
    pub fn all_options(options: &[OptionItem]) -> Self {
        Self {
            label: ALL_OPTIONS_BUCKET.to_string(),
            option_ids: options.iter().map(|o| o.id.clone()).collect(),
        }
    }
}

/// The navigation step a result answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    pub level0: String,
    pub path_labels: Vec<String>,
}

impl StepInfo {
    pub fn for_request(request: &NavigationRequest) -> Self {
        Self {
            level0: request.domain().as_str().to_string(),
            path_labels: request.path_labels(),
        }
    }
}

/// Per-response metadata. Filled in by the resolver; cached values carry
/// the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub cache_hit: bool,
    /// The caller joined a fetch already in flight for the same key.
    pub coalesced: bool,
    pub requested_max: u32,
    pub returned_count: usize,
    pub latency_ms: u64,
    pub build: String,
}

impl Default for ResultMeta {
    fn default() -> Self {
        Self {
            cache_hit: false,
            coalesced: false,
            requested_max: 0,
            returned_count: 0,
            latency_ms: 0,
            build: BUILD_STAMP.to_string(),
        }
    }
}

/// A fully validated answer to a navigation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionsResult {
    pub mode: ResultMode,
    pub step: StepInfo,
    pub options: Vec<OptionItem>,
    pub buckets: Vec<Bucket>,
    pub can_confirm_here: bool,
    pub confirm_reason: String,
    pub warnings: Vec<String>,
    pub meta: ResultMeta,
}

impl OptionsResult {
    pub fn is_stub(&self) -> bool {
        self.mode == ResultMode::Stub
    }

    /// Return every invariant this result breaks for the given limit.
    /// An empty vector means the result is safe to hand to a caller.
    pub fn invariant_violations(&self, max_options: u32) -> Vec<String> {
        let mut violations = Vec::new();

        if self.options.len() > max_options as usize {
            violations.push(format!(
                "{} options exceed max_options {}",
                self.options.len(),
                max_options
            ));
        }

        let mut seen = HashSet::new();
        for option in &self.options {
            if !seen.insert(option.id.as_str()) {
                violations.push(format!("duplicate option id '{}'", option.id));
            }
            if !(0.0..=1.0).contains(&option.confidence) {
                violations.push(format!(
                    "confidence {} out of range on '{}'",
                    option.confidence, option.id
                ));
            }
        }

        if self.buckets.is_empty() {
            violations.push("no buckets".to_string());
        }
        for bucket in &self.buckets {
            if bucket.option_ids.is_empty() {
                violations.push(format!("bucket '{}' is empty", bucket.label));
            }
            for id in &bucket.option_ids {
                if !seen.contains(id.as_str()) {
                    violations.push(format!(
                        "bucket '{}' references unknown id '{}'",
                        bucket.label, id
                    ));
                }
            }
        }

        violations
    }
}
