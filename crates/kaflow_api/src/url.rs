use url::Url;

use crate::error::ApiError;

/// Default server root used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8102";

/// Path segment every endpoint lives under.
pub const API_PREFIX: &str = "api";

/// Resolve an endpoint path against the server root.
///
/// Resolution rules:
/// 1) absolute `http://` / `https://` paths pass through unchanged
/// 2) a base already ending in `/api` is not prefixed twice
/// 3) otherwise the path is joined under `{base}/api/`
pub fn resolve_api_url(base_url: &str, path: &str) -> Result<String, ApiError> {
    let path = path.trim();
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }

    let base = if base_url.trim().is_empty() {
        DEFAULT_BASE_URL
    } else {
        base_url.trim()
    };
    let parsed = Url::parse(base).map_err(|error| ApiError::InvalidBaseUrl(format!("{base}: {error}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!(
            "{base}: unsupported scheme {}",
            parsed.scheme()
        )));
    }

    let trimmed = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if trimmed.ends_with(&format!("/{API_PREFIX}")) {
        return Ok(format!("{trimmed}/{path}"));
    }
    Ok(format!("{trimmed}/{API_PREFIX}/{path}"))
}
