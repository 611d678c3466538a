//! Fuzz test for the payload normalizer
//!
//! Feeds arbitrary JSON to `normalize` and checks that any accepted result
//! satisfies every structural invariant.
//!
//! Run with: cargo +nightly fuzz run normalize_fuzz -- -max_total_time=60

#![no_main]

use drilldown_core::{normalize, Domain, NavigationRequest, Normalized, PathStep, RawPayload};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(rest) else {
        return;
    };

    let domain = Domain::ALL[selector as usize % Domain::ALL.len()];
    let max_options = u32::from(selector % 60) + 1;
    let path = (0..selector % 4)
        .filter_map(|i| PathStep::new(&format!("step-{}", i), "Step"))
        .collect();
    let request = NavigationRequest::new(domain, path, max_options);

    match normalize(&RawPayload::new(value), &request) {
        Normalized::Valid(result) => {
            let violations = result.invariant_violations(max_options);
            assert!(violations.is_empty(), "invariants broken: {:?}", violations);
        }
        Normalized::Invalid(reasons) => {
            assert!(!reasons.is_empty(), "rejection must carry a reason");
        }
    }
});
