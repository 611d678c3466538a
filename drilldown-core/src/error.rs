//! Error types for drilldown operations

use std::fmt;
use thiserror::Error;

/// Input errors. Fatal for the request; never cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("Invalid level0 '{value}': expected one of {allowed}")]
    InvalidDomain { value: String, allowed: String },

    #[error("Malformed request body: {reason}")]
    MalformedBody { reason: String },
}

/// Classification of an upstream (generative backend) failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamErrorKind {
    /// No API key configured.
    NoCredential,
    /// Connection, TLS, timeout or body-read failure.
    Transport,
    /// Non-success HTTP status.
    Http(u16),
    /// The call succeeded but carried no text.
    EmptyOutput,
    /// Text was present but no JSON object could be recovered from it.
    MalformedJson,
}

impl UpstreamErrorKind {
    /// Stable snake_case code used in warnings, logs and metric labels.
    pub fn code(&self) -> String {
        match self {
            Self::NoCredential => "no_credential".to_string(),
            Self::Transport => "transport_error".to_string(),
            Self::Http(status) => format!("http_{}", status),
            Self::EmptyOutput => "empty_output".to_string(),
            Self::MalformedJson => "malformed_json".to_string(),
        }
    }

    /// Low-cardinality label for metrics (all HTTP statuses collapse).
    pub fn metric_label(&self) -> &'static str {
        match self {
            Self::NoCredential => "no_credential",
            Self::Transport => "transport_error",
            Self::Http(_) => "http_error",
            Self::EmptyOutput => "empty_output",
            Self::MalformedJson => "malformed_json",
        }
    }
}

impl fmt::Display for UpstreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

/// Upstream failure with its classification and free-form details.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Upstream {kind}: {details}")]
pub struct UpstreamError {
    pub kind: UpstreamErrorKind,
    pub details: String,
}

/// Maximum characters of upstream detail carried into a warning.
const WARNING_DETAIL_CHARS: usize = 120;

impl UpstreamError {
    pub fn new(kind: UpstreamErrorKind, details: impl Into<String>) -> Self {
        Self {
            kind,
            details: details.into(),
        }
    }

    pub fn no_credential() -> Self {
        Self::new(UpstreamErrorKind::NoCredential, "no API key configured")
    }

    pub fn transport(details: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Transport, details)
    }

    pub fn http(status: u16, details: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::Http(status), details)
    }

    pub fn empty_output() -> Self {
        Self::new(UpstreamErrorKind::EmptyOutput, "model returned no text")
    }

    pub fn malformed_json(details: impl Into<String>) -> Self {
        Self::new(UpstreamErrorKind::MalformedJson, details)
    }

    /// Render as a caller-visible warning line.
    pub fn to_warning(&self) -> String {
        let details = crate::constants::truncate_chars(&self.details, WARNING_DETAIL_CHARS);
        if details.is_empty() {
            format!("upstream unavailable ({})", self.kind)
        } else {
            format!("upstream unavailable ({}): {}", self.kind, details)
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Cache coordination errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Shared fetch for {key} aborted: {reason}")]
    ProducerAborted { key: String, reason: String },
}

/// Master error type for all drilldown errors.
#[derive(Debug, Clone, Error)]
pub enum DrilldownError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Upstream error: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),
}

/// Result type alias for drilldown operations.
pub type DrilldownResult<T> = Result<T, DrilldownError>;

// =============================================================================
// TESTS
// =============================================================================
