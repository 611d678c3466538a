//! DRILLDOWN Core - Request and Result Types
//!
//! Pure, synchronous building blocks shared by every other crate: the
//! canonical request produced by the sanitizer, the result shape returned
//! to callers, the normalizer that turns an untrusted upstream payload into
//! that shape, and the deterministic fallback used when it cannot.

pub mod constants;
pub mod domain;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod result;
pub mod sanitize;

pub use constants::*;
pub use domain::{Domain, NavigationRequest, PathStep};
pub use error::{
    CacheError, ConfigError, DrilldownError, DrilldownResult, InputError, UpstreamError,
    UpstreamErrorKind,
};
pub use fallback::fallback_result;
pub use normalize::{normalize, Normalized, RawPayload};
pub use result::{Bucket, OptionItem, OptionsResult, ResultMeta, ResultMode, StepInfo};
pub use sanitize::{sanitize, RawNavigationRequest};
