use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::ApiConfig;
use crate::error::ApiError;

pub const HEADER_ACCEPT: &str = "accept";
pub const HEADER_CACHE_CONTROL: &str = "cache-control";
pub const HEADER_CONTENT_TYPE: &str = "content-type";
pub const HEADER_USER_AGENT: &str = "user-agent";

/// Which endpoint family the headers are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    EventStream,
    Json,
}

/// Build a deterministic header map for KaFlow requests.
pub fn build_headers(config: &ApiConfig, kind: RequestKind) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();

    headers.insert(
        HEADER_CONTENT_TYPE.to_owned(),
        "application/json".to_owned(),
    );
    match kind {
        RequestKind::EventStream => {
            headers.insert(HEADER_ACCEPT.to_owned(), "text/event-stream".to_owned());
            headers.insert(HEADER_CACHE_CONTROL.to_owned(), "no-cache".to_owned());
        }
        RequestKind::Json => {
            headers.insert(HEADER_ACCEPT.to_owned(), "application/json".to_owned());
        }
    }

    let ua = config
        .user_agent
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(default_user_agent);
    headers.insert(HEADER_USER_AGENT.to_owned(), ua);

    for (key, value) in &config.extra_headers {
        headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_owned());
    }

    headers
}

pub fn to_header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap, ApiError> {
    let mut out = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| ApiError::InvalidHeader {
            name: key.clone(),
            reason: "invalid header name",
        })?;
        let value = HeaderValue::from_str(value).map_err(|_| ApiError::InvalidHeader {
            name: key.clone(),
            reason: "invalid header value",
        })?;
        out.insert(name, value);
    }
    Ok(out)
}

fn default_user_agent() -> String {
    format!("kaflow_api/{}", env!("CARGO_PKG_VERSION"))
}
