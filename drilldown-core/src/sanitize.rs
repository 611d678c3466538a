//! Request sanitization.
//!
//! Turns a raw body of unknown shape into a canonical [`NavigationRequest`].
//! Only the domain is fatal; every other field is coerced or dropped.
//! Malformed path entries are dropped silently rather than rejecting the
//! whole request.

use serde::Deserialize;
use serde_json::Value;

use crate::constants::{DEFAULT_MAX_OPTIONS, MAX_OPTIONS_LIMIT};
use crate::domain::{Domain, NavigationRequest, PathStep};
use crate::error::InputError;

/// Raw inbound body. Every field is kept as an untyped JSON value so that
/// wrong types degrade instead of failing deserialization.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNavigationRequest {
    #[serde(default)]
    pub level0: Value,
    #[serde(default)]
    pub path: Value,
    #[serde(default)]
    pub max_options: Value,
}

impl RawNavigationRequest {
    /// Parse a request body. Anything that is not a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, InputError> {
        let malformed = |e: serde_json::Error| InputError::MalformedBody {
            reason: e.to_string(),
        };
        let value: Value = serde_json::from_slice(body).map_err(malformed)?;
        if !value.is_object() {
            return Err(InputError::MalformedBody {
                reason: "expected a JSON object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(malformed)
    }
}

/// Validate and canonicalize a raw request.
pub fn sanitize(raw: &RawNavigationRequest) -> Result<NavigationRequest, InputError> {
    let domain = match &raw.level0 {
        Value::String(s) => s.parse::<Domain>()?,
        other => {
            return Err(InputError::InvalidDomain {
                value: other.to_string(),
                allowed: Domain::allowed_list(),
            })
        }
    };

    Ok(NavigationRequest::new(
        domain,
        sanitize_path(&raw.path),
        coerce_max_options(&raw.max_options),
    ))
}

/// Keep well-formed steps in order. Bare strings count as `{id, label}`
/// with the same value.
fn sanitize_path(path: &Value) -> Vec<PathStep> {
    let Value::Array(entries) = path else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => PathStep::new(s, s),
            Value::Object(map) => {
                let id = map.get("id").and_then(Value::as_str)?;
                let label = map.get("label").and_then(Value::as_str)?;
                PathStep::new(id, label)
            }
            _ => None,
        })
        .collect()
}

fn coerce_max_options(value: &Value) -> u32 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match number {
        Some(n) if n.is_finite() => n.trunc().clamp(1.0, MAX_OPTIONS_LIMIT as f64) as u32,
        _ => DEFAULT_MAX_OPTIONS,
    }
}
