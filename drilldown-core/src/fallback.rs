//! Deterministic stub results used whenever the upstream is unusable.

use crate::constants::{FALLBACK_OPTION_COUNT, STUB_WARNING};
use crate::domain::{Domain, PathStep};
use crate::result::{Bucket, OptionItem, OptionsResult, ResultMeta, ResultMode, StepInfo};

const STUB_SPLIT_DIMENSION: &str = "stub";
const STUB_CONFIDENCE: f64 = 0.6;
const STUB_CONFIRM_REASON: &str =
    "Stub mode: confirmation becomes available after two levels of selection.";

/// Build the placeholder result for a request.
///
/// Identical arguments always yield identical output. `extra_warnings` are
/// kept in order ahead of the fixed stub warning.
pub fn fallback_result(
    domain: Domain,
    path: &[PathStep],
    max_options: u32,
    extra_warnings: Vec<String>,
) -> OptionsResult {
    let depth = path.len() + 1;
    let count = max_options.min(FALLBACK_OPTION_COUNT);

    let options: Vec<OptionItem> = (1..=count)
        .map(|i| OptionItem {
            id: format!("{}-{}-{}", domain.as_str(), depth, i),
            label: format!("{} option {}.{}", domain.label(), depth, i),
            description: format!("Stub option for {} at depth {}.", domain.as_str(), depth),
            split_dimension: STUB_SPLIT_DIMENSION.to_string(),
            confidence: STUB_CONFIDENCE,
        })
        .collect();

    let mut warnings = extra_warnings;
    warnings.push(STUB_WARNING.to_string());

    OptionsResult {
        mode: ResultMode::Stub,
        step: StepInfo {
            level0: domain.as_str().to_string(),
            path_labels: path.iter().map(|s| s.label().to_string()).collect(),
        },
        buckets: vec![Bucket::all_options(&options)],
        options,
        can_confirm_here: path.len() >= 2,
        confirm_reason: STUB_CONFIRM_REASON.to_string(),
        warnings,
        meta: ResultMeta::default(),
    }
}
