//! Fuzz test for model output extraction
//!
//! Arbitrary response bodies and model text must never panic, and a
//! recovered value is always a JSON object.
//!
//! Run with: cargo +nightly fuzz run extract_json_fuzz -- -max_total_time=60

#![no_main]

use drilldown_llm::{extract_json_object, extract_output_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        let text = extract_output_text(input);

        if let Some(value) = extract_json_object(input) {
            assert!(value.is_object());
        }
        if let Some(value) = extract_json_object(&text) {
            assert!(value.is_object());
        }
    }
});
