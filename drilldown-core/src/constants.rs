//! Fixed limits shared by the sanitizer, normalizer, prompt and fallback.

/// Upper bound for `max_options` after clamping.
pub const MAX_OPTIONS_LIMIT: u32 = 60;

/// `max_options` used when the caller sends nothing usable.
pub const DEFAULT_MAX_OPTIONS: u32 = 10;

/// Option count below which the normalizer emits a low-count warning.
/// The effective floor is `min(MIN_OPTIONS_FLOOR, max_options)`.
pub const MIN_OPTIONS_FLOOR: u32 = 6;

/// Number of placeholder options the fallback generator produces at most.
pub const FALLBACK_OPTION_COUNT: u32 = 10;

/// Bucket range requested from the model.
pub const MIN_REQUESTED_BUCKETS: u32 = 6;
pub const MAX_REQUESTED_BUCKETS: u32 = 12;

/// Character caps applied to path steps and option fields.
pub const MAX_ID_CHARS: usize = 120;
pub const MAX_LABEL_CHARS: usize = 200;

/// Path steps beyond this depth are dropped.
pub const MAX_PATH_DEPTH: usize = 24;

/// Label of the catch-all bucket.
pub const ALL_OPTIONS_BUCKET: &str = "All options";

/// Warning appended to every fallback result.
pub const STUB_WARNING: &str = "stub fallback active";

/// Build stamp reported in result metadata.
pub const BUILD_STAMP: &str = concat!("drilldown-", env!("CARGO_PKG_VERSION"));

/// Effective low-count floor for a request.
pub fn options_floor(max_options: u32) -> u32 {
    MIN_OPTIONS_FLOOR.min(max_options)
}

/// Truncate `value` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
