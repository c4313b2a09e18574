use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: &'static str },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {message}")]
    Status { status: StatusCode, message: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("request was cancelled")]
    Cancelled,

    #[error("no async runtime available to drive the stream: {0}")]
    NoRuntime(String),
}

impl ApiError {
    /// True for caller-initiated aborts, which are never surfaced as failures.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }
}

/// Reduce a non-success response body to a readable message.
///
/// Looks for `error` (string or `{message}`), then `message`, then `detail`;
/// otherwise falls back to the raw body or the canonical reason phrase.
pub fn parse_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.to_string()
        }
    };

    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    let from_error = parsed.get("error").and_then(|error| match error {
        Value::String(message) => non_empty(message),
        Value::Object(_) => error
            .get("message")
            .and_then(Value::as_str)
            .and_then(non_empty),
        _ => None,
    });

    from_error
        .or_else(|| parsed.get("message").and_then(Value::as_str).and_then(non_empty))
        .or_else(|| parsed.get("detail").and_then(detail_message))
        .unwrap_or_else(fallback)
}

fn detail_message(detail: &Value) -> Option<String> {
    match detail {
        Value::String(message) => non_empty(message),
        // Validation errors arrive as a list of `{msg, loc}` objects.
        Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
