//! Response parsing: turn the model's text answer into a JSON object.
//!
//! Models are told not to wrap their answer in code fences, and sometimes do
//! anyway. We strip one outer fence (with or without a language tag), or a
//! stray marker at the very start or end, trim, and decode. Nothing inside
//! the answer is rewritten, so backticks in values survive. Anything that is not a JSON object
//! afterwards is a [`ExtractError::Decode`] carrying the raw answer so the
//! operator can see what came back.

use crate::error::ExtractError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// The decoded answer: field name → value, in the model's order.
///
/// Keys are passed through as-is; see [`crate::prompts::missing_fields`] to
/// check them against the schema.
pub type FinancialData = Map<String, Value>;

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n(.*?)\r?\n?```$").unwrap());

static RE_STRAY_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A```(?:json)?|```\z").unwrap());

/// Remove code-fence markers from a model answer and trim it.
///
/// Idempotent: stripping an already-stripped answer is a no-op.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let inner = match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => trimmed,
    };
    RE_STRAY_FENCE.replace_all(inner.trim(), "").trim().to_string()
}

/// Decode a model answer into [`FinancialData`].
///
/// # Errors
/// [`ExtractError::Decode`] if the cleaned answer is not valid JSON or is
/// valid JSON but not an object.
pub fn parse_response(raw: &str) -> Result<FinancialData, ExtractError> {
    let cleaned = strip_code_fences(raw);

    let value: Value = serde_json::from_str(&cleaned).map_err(|e| ExtractError::Decode {
        reason: e.to_string(),
        raw: raw.to_string(),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::Decode {
            reason: format!("expected a JSON object, got {}", json_kind(&other)),
            raw: raw.to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
