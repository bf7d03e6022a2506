//! Lenient parsing of generative model output.
//!
//! Model responses are untrusted text: sometimes clean JSON, sometimes JSON
//! wrapped in a markdown fence, sometimes prose. Every parse here is tagged:
//! callers pattern-match on structured vs raw instead of relying on
//! absence-of-error.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Outcome of parsing a model response as JSON.
///
/// `Raw` carries the original response text so degraded consumers can still
/// work with it.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmJson<T> {
    Structured(T),
    Raw(String),
}

impl<T> LlmJson<T> {
    pub fn is_structured(&self) -> bool {
        matches!(self, LlmJson::Structured(_))
    }
}

/// Parse a model response into `T`, accepting either a bare JSON document or
/// one wrapped in a ```json fence.
pub fn parse_llm_json<T: DeserializeOwned>(response: &str) -> LlmJson<T> {
    let candidate = json_block(response);
    match serde_json::from_str::<T>(candidate) {
        Ok(parsed) => LlmJson::Structured(parsed),
        Err(_) => LlmJson::Raw(response.to_string()),
    }
}

/// Isolate the JSON payload from a response that may wrap it in a markdown
/// code fence or surround it with prose.
fn json_block(response: &str) -> &str {
    if let Some(start) = response.find("```json") {
        let body = &response[start + 7..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }
    // No fence: trim to the outermost JSON bracket if one exists.
    let trimmed = response.trim();
    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(o), Some(c)) if c > o => trimmed[o..=c].trim(),
        _ => trimmed,
    }
}

/// A numeric field coerced from loose JSON, with a flag recording whether the
/// default had to be substituted. The flag feeds confidence auditing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coerced {
    pub value: f64,
    pub defaulted: bool,
}

/// Coerce a JSON value (number, or numeric string like `"12.5"` or `"$1,200"`)
/// to `f64`, substituting `default` when the value is absent or unparseable.
pub fn coerce_f64(value: Option<&Value>, default: f64) -> Coerced {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Coerced {
            value: v,
            defaulted: false,
        },
        _ => Coerced {
            value: default,
            defaulted: true,
        },
    }
}

/// Clamp a confidence score into [0, 1].
pub fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
