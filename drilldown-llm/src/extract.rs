//! Recovery of model output from a provider response body.

use serde_json::Value;

use crate::providers::openai::types::ResponsesResponse;

const FENCE: &str = "```";

/// Pull the model text out of a Responses API body.
///
/// Prefers the aggregated `output_text`, then the concatenated
/// `output[].content[].text` parts, then the raw body itself.
pub fn extract_output_text(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ResponsesResponse>(body) else {
        return body.to_string();
    };

    if let Some(text) = parsed.output_text.filter(|t| !t.trim().is_empty()) {
        return text;
    }

    let parts: String = parsed
        .output
        .iter()
        .flat_map(|item| item.content.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();
    if !parts.trim().is_empty() {
        return parts;
    }

    body.to_string()
}

/// Recover a JSON object from free-form text.
///
/// Tries, in order: the whole text, the first fenced block (```` ```json ````
/// or a bare fence), and the slice from the first `{` to the last `}`.
/// Only objects are accepted.
pub fn extract_json_object(text: &str) -> Option<Value> {
    let trimmed = text.trim();

    parse_object(trimmed)
        .or_else(|| fenced_block(trimmed).and_then(parse_object))
        .or_else(|| brace_slice(trimmed).and_then(parse_object))
}

fn parse_object(candidate: &str) -> Option<Value> {
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find(FENCE)?;
    let after = &text[start + FENCE.len()..];
    // Skip the info string ("json", "JSON", ...) up to the end of the line.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find(FENCE)?;
    Some(body[..end].trim())
}

fn brace_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}
