//! Classification of non-success Gemini responses.
//!
//! The API reports errors as `{ "error": { code, message, status, details } }`
//! (occasionally wrapped in a one-element array). Classification looks at the
//! HTTP status, the structured code and status, and the wording of the
//! message, because quota failures are not always sent with a 429.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use squidai_types::llm::LlmError;

use super::types::{ApiError, ApiErrorEnvelope};

const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

static RETRY_IN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)retry in ([\d.]+)s").ok());

static SECONDS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"([\d.]+)s?").ok());

/// Map a non-success response to an [`LlmError`].
pub fn classify_error(status: u16, body: &str) -> LlmError {
    let api_error = parse_error_body(body);
    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback_message(status, body));
    let lower = message.to_lowercase();

    if status == 401 || lower.contains("invalid api key") || lower.contains("unauthorized") {
        return LlmError::AuthenticationFailed(message);
    }

    let rate_limited = status == 429
        || api_error.as_ref().is_some_and(|e| {
            e.code == Some(429) || e.status.as_deref() == Some("RESOURCE_EXHAUSTED")
        })
        || lower.contains("quota")
        || lower.contains("rate limit");

    if rate_limited {
        let details = api_error.as_ref().map(|e| e.details.as_slice()).unwrap_or(&[]);
        let retry_after_ms = retry_info_delay_ms(details).or_else(|| retry_delay_from_message(&message));
        return LlmError::RateLimited {
            message,
            retry_after_ms,
        };
    }

    LlmError::Upstream { status, message }
}

fn parse_error_body(body: &str) -> Option<ApiError> {
    let value: Value = serde_json::from_str(body).ok()?;
    let envelope = match value {
        Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
        other => other,
    };
    serde_json::from_value::<ApiErrorEnvelope>(envelope)
        .ok()
        .map(|e| e.error)
}

fn fallback_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("Gemini API returned HTTP {status}")
    } else {
        body.to_string()
    }
}

/// Parse "retry in N s" from a message, rounded up to whole seconds.
pub fn retry_delay_from_message(message: &str) -> Option<u64> {
    let captures = RETRY_IN.as_ref()?.captures(message)?;
    seconds_to_ms(captures.get(1)?.as_str())
}

/// Read the `retryDelay` of a `RetryInfo` detail (e.g. `"3s"`).
fn retry_info_delay_ms(details: &[Value]) -> Option<u64> {
    let delay = details
        .iter()
        .find(|d| d.get("@type").and_then(Value::as_str) == Some(RETRY_INFO_TYPE))?
        .get("retryDelay")?;
    let text = match delay {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let captures = SECONDS.as_ref()?.captures(&text)?;
    seconds_to_ms(captures.get(1)?.as_str())
}

fn seconds_to_ms(raw: &str) -> Option<u64> {
    let secs: f64 = raw.parse().ok()?;
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Some(secs.ceil() as u64 * 1000)
}
