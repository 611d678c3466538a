//! Response normalization.
//!
//! The upstream payload is untrusted. [`normalize`] repairs what it can,
//! records every repair as a warning, and reports the payload as
//! [`Normalized::Invalid`] when nothing usable remains.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::constants::{options_floor, truncate_chars, MAX_ID_CHARS, MAX_LABEL_CHARS};
use crate::domain::NavigationRequest;
use crate::result::{Bucket, OptionItem, OptionsResult, ResultMeta, ResultMode, StepInfo};

const DEFAULT_SPLIT_DIMENSION: &str = "N/A";
const DEFAULT_CONFIDENCE: f64 = 0.5;
const DEFAULT_CONFIRM_REASON: &str = "No confirmation guidance provided.";
const MAX_REASON_CHARS: usize = 500;

/// A JSON value recovered from the upstream, not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload(Value);

impl RawPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for RawPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Outcome of normalizing a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A result satisfying every invariant for the request.
    Valid(OptionsResult),
    /// The payload was unusable; carries the reasons.
    Invalid(Vec<String>),
}

impl Normalized {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

/// Look up a field under its snake_case name, then its camelCase alias.
fn field<'a>(map: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    map.get(name).or_else(|| map.get(alias))
}

fn non_empty_str(value: Option<&Value>, max_chars: usize) -> Option<String> {
    let s = value?.as_str()?;
    let s = truncate_chars(s.trim(), max_chars).trim_end();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Confidence and whether it had to be clamped.
fn coerce_confidence(value: Option<&Value>) -> (f64, bool) {
    match value.and_then(Value::as_f64) {
        Some(c) if c.is_finite() => {
            let clamped = c.clamp(0.0, 1.0);
            (clamped, clamped != c)
        }
        _ => (DEFAULT_CONFIDENCE, false),
    }
}

#[derive(Default)]
struct OptionStats {
    dropped: usize,
    duplicates: usize,
    clamped: usize,
}

fn collect_options(entries: &[Value]) -> (Vec<OptionItem>, OptionStats) {
    let mut stats = OptionStats::default();
    let mut seen = HashSet::new();
    let mut options = Vec::new();

    for entry in entries {
        let Some(map) = entry.as_object() else {
            stats.dropped += 1;
            continue;
        };
        let (Some(id), Some(label)) = (
            non_empty_str(map.get("id"), MAX_ID_CHARS),
            non_empty_str(map.get("label"), MAX_LABEL_CHARS),
        ) else {
            stats.dropped += 1;
            continue;
        };
        if !seen.insert(id.clone()) {
            stats.duplicates += 1;
            continue;
        }

        let (confidence, clamped) = coerce_confidence(map.get("confidence"));
        if clamped {
            stats.clamped += 1;
        }

        options.push(OptionItem {
            id,
            label,
            description: map
                .get("description")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            split_dimension: non_empty_str(
                field(map, "split_dimension", "splitDimension"),
                MAX_LABEL_CHARS,
            )
            .unwrap_or_else(|| DEFAULT_SPLIT_DIMENSION.to_string()),
            confidence,
        });
    }

    (options, stats)
}

/// Keep buckets that still reference at least one surviving option.
/// Returns the buckets and how many candidates were dropped.
fn collect_buckets(raw: Option<&Value>, options: &[OptionItem]) -> (Vec<Bucket>, usize) {
    let Some(Value::Array(candidates)) = raw else {
        return (Vec::new(), 0);
    };

    let known: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
    let mut buckets = Vec::new();
    let mut dropped = 0;

    for (index, candidate) in candidates.iter().enumerate() {
        let Some(map) = candidate.as_object() else {
            dropped += 1;
            continue;
        };

        let mut seen = HashSet::new();
        let option_ids: Vec<String> = match field(map, "option_ids", "optionIds") {
            Some(Value::Array(ids)) => ids
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|id| known.contains(id) && seen.insert(*id))
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        if option_ids.is_empty() {
            dropped += 1;
            continue;
        }

        let label = non_empty_str(map.get("label"), MAX_LABEL_CHARS)
            .unwrap_or_else(|| format!("Group {}", index + 1));
        buckets.push(Bucket { label, option_ids });
    }

    (buckets, dropped)
}

/// Validate and repair an upstream payload for the given request.
pub fn normalize(payload: &RawPayload, request: &NavigationRequest) -> Normalized {
    let Some(root) = payload.as_value().as_object() else {
        return Normalized::Invalid(vec!["payload is not a JSON object".to_string()]);
    };
    let Some(Value::Array(entries)) = root.get("options") else {
        return Normalized::Invalid(vec!["payload has no options array".to_string()]);
    };

    let max = request.max_options() as usize;
    let floor = options_floor(request.max_options()) as usize;

    let (mut options, stats) = collect_options(entries);
    if options.is_empty() {
        let mut reasons = vec!["no usable options in payload".to_string()];
        if stats.dropped > 0 {
            reasons.push(format!("{} option(s) missing id or label", stats.dropped));
        }
        return Normalized::Invalid(reasons);
    }

    let mut warnings: Vec<String> = match root.get("warnings") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    if stats.dropped > 0 {
        warnings.push(format!(
            "dropped {} option(s) missing id or label",
            stats.dropped
        ));
    }
    if stats.duplicates > 0 {
        warnings.push(format!(
            "dropped {} duplicate option id(s)",
            stats.duplicates
        ));
    }
    if stats.clamped > 0 {
        warnings.push(format!(
            "clamped confidence on {} option(s)",
            stats.clamped
        ));
    }

    let truncated_from = options.len();
    options.truncate(max);

    let (mut buckets, dropped_buckets) = collect_buckets(root.get("buckets"), &options);
    if dropped_buckets > 0 {
        warnings.push(format!(
            "dropped {} bucket(s) with no valid option ids",
            dropped_buckets
        ));
    }
    if buckets.is_empty() {
        buckets.push(Bucket::all_options(&options));
    }

    if truncated_from > max {
        warnings.push(format!(
            "truncated options from {} to {}",
            truncated_from, max
        ));
    }
    if options.len() < floor {
        warnings.push(format!(
            "only {} option(s) returned, expected at least {}",
            options.len(),
            floor
        ));
    }

    Normalized::Valid(OptionsResult {
        mode: ResultMode::Llm,
        step: StepInfo::for_request(request),
        options,
        buckets,
        can_confirm_here: coerce_bool(field(root, "can_confirm_here", "canConfirmHere")),
        confirm_reason: non_empty_str(field(root, "confirm_reason", "confirmReason"), MAX_REASON_CHARS)
            .unwrap_or_else(|| DEFAULT_CONFIRM_REASON.to_string()),
        warnings,
        meta: ResultMeta::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ALL_OPTIONS_BUCKET;
    use crate::domain::{Domain, PathStep};
    use serde_json::json;

    fn request(max: u32) -> NavigationRequest {
        let path = PathStep::new("gadgets", "Gadgets").into_iter().collect();
        NavigationRequest::new(Domain::PhysicalProducts, path, max)
    }

    fn option(id: &str) -> Value {
        json!({"id": id, "label": format!("Label {}", id), "confidence": 0.9})
    }

    fn valid(normalized: Normalized) -> OptionsResult {
        match normalized {
            Normalized::Valid(result) => result,
            Normalized::Invalid(reasons) => panic!("expected valid, got {:?}", reasons),
        }
    }

    #[test]
    fn test_normalize_well_formed_payload() {
        let payload = RawPayload::new(json!({
            "options": (1..=6).map(|i| option(&format!("o{}", i))).collect::<Vec<_>>(),
            "buckets": [{"label": "First", "option_ids": ["o1", "o2"]}],
            "can_confirm_here": true,
            "confirm_reason": "Specific enough."
        }));
        let result = valid(normalize(&payload, &request(10)));
        assert_eq!(result.mode, ResultMode::Llm);
        assert_eq!(result.options.len(), 6);
        assert_eq!(result.buckets.len(), 1);
        assert!(result.can_confirm_here);
        assert_eq!(result.confirm_reason, "Specific enough.");
        assert_eq!(result.step.level0, "physical-products");
        assert_eq!(result.step.path_labels, vec!["Gadgets"]);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_normalize_rejects_unusable_payloads() {
        let req = request(10);
        assert!(!normalize(&RawPayload::new(json!([1, 2])), &req).is_valid());
        assert!(!normalize(&RawPayload::new(json!({"foo": 1})), &req).is_valid());
        assert!(!normalize(&RawPayload::new(json!({"options": "x"})), &req).is_valid());
        assert!(!normalize(&RawPayload::new(json!({"options": [{"id": ""}]})), &req).is_valid());
    }

    #[test]
    fn test_normalize_drops_bad_and_duplicate_options() {
        let payload = RawPayload::new(json!({
            "options": [
                option("a"),
                {"id": "a", "label": "Again"},
                {"id": "  ", "label": "Blank"},
                {"label": "No id"},
                "not an object",
                option("b")
            ]
        }));
        let result = valid(normalize(&payload, &request(10)));
        let ids: Vec<&str> = result.options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(result.warnings.iter().any(|w| w.contains("dropped 3 option(s)")));
        assert!(result.warnings.iter().any(|w| w.contains("duplicate")));
        assert!(result.warnings.iter().any(|w| w.contains("only 2 option(s)")));
    }

    #[test]
    fn test_normalize_defaults_and_aliases() {
        let payload = RawPayload::new(json!({
            "options": [
                {"id": "a", "label": "A"},
                {"id": "b", "label": "B", "splitDimension": "price", "confidence": "high"}
            ],
            "canConfirmHere": "yes",
            "confirmReason": "  "
        }));
        let result = valid(normalize(&payload, &request(2)));
        assert_eq!(result.options[0].description, "");
        assert_eq!(result.options[0].split_dimension, "N/A");
        assert_eq!(result.options[0].confidence, DEFAULT_CONFIDENCE);
        assert_eq!(result.options[1].split_dimension, "price");
        assert_eq!(result.options[1].confidence, DEFAULT_CONFIDENCE);
        assert!(result.can_confirm_here);
        assert_eq!(result.confirm_reason, DEFAULT_CONFIRM_REASON);
    }

    #[test]
    fn test_normalize_clamps_confidence() {
        let payload = RawPayload::new(json!({
            "options": [
                {"id": "a", "label": "A", "confidence": 7},
                {"id": "b", "label": "B", "confidence": -1.5}
            ]
        }));
        let result = valid(normalize(&payload, &request(2)));
        assert_eq!(result.options[0].confidence, 1.0);
        assert_eq!(result.options[1].confidence, 0.0);
        assert!(result
            .warnings
            .iter()
            .any(|w| w == "clamped confidence on 2 option(s)"));
    }

    #[test]
    fn test_normalize_truncates_to_max() {
        let payload = RawPayload::new(json!({
            "options": (1..=20).map(|i| option(&format!("o{}", i))).collect::<Vec<_>>(),
            "buckets": [{"label": "Tail", "option_ids": ["o15", "o16"]}]
        }));
        let result = valid(normalize(&payload, &request(8)));
        assert_eq!(result.options.len(), 8);
        assert_eq!(result.buckets.len(), 1);
        assert_eq!(result.buckets[0].label, ALL_OPTIONS_BUCKET);
        assert!(result.warnings.iter().any(|w| w == "truncated options from 20 to 8"));
        assert!(result.warnings.iter().any(|w| w.contains("dropped 1 bucket")));
        assert!(result.invariant_violations(8).is_empty());
    }

    #[test]
    fn test_normalize_bucket_repairs() {
        let payload = RawPayload::new(json!({
            "options": [option("a"), option("b"), option("c")],
            "buckets": [
                {"optionIds": ["a", "a", "ghost", "b"]},
                {"label": "Empty", "option_ids": []},
                {"label": "Cs", "option_ids": ["c"]}
            ]
        }));
        let result = valid(normalize(&payload, &request(3)));
        assert_eq!(result.buckets.len(), 2);
        assert_eq!(result.buckets[0].label, "Group 1");
        assert_eq!(result.buckets[0].option_ids, vec!["a", "b"]);
        assert_eq!(result.buckets[1].label, "Cs");
    }

    #[test]
    fn test_normalize_payload_warnings_come_first() {
        let payload = RawPayload::new(json!({
            "options": [option("a"), option("a")],
            "warnings": ["model note", 42]
        }));
        let result = valid(normalize(&payload, &request(1)));
        assert_eq!(result.warnings[0], "model note");
        assert!(result.warnings[1].contains("duplicate"));
    }

    #[test]
    fn test_can_confirm_coercion() {
        assert!(coerce_bool(Some(&json!(true))));
        assert!(coerce_bool(Some(&json!("TRUE"))));
        assert!(coerce_bool(Some(&json!("1"))));
        assert!(coerce_bool(Some(&json!(2))));
        assert!(!coerce_bool(Some(&json!(0))));
        assert!(!coerce_bool(Some(&json!("no"))));
        assert!(!coerce_bool(Some(&json!(null))));
        assert!(!coerce_bool(None));
    }
}
