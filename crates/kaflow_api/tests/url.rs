use kaflow_api::{resolve_api_url, ApiError, DEFAULT_BASE_URL};

#[test]
fn url_joins_paths_under_api_prefix() {
    assert_eq!(
        resolve_api_url("http://localhost:8102", "chat/stream").expect("valid base"),
        "http://localhost:8102/api/chat/stream"
    );
    assert_eq!(
        resolve_api_url("http://localhost:8102/", "/configs").expect("valid base"),
        "http://localhost:8102/api/configs"
    );
}

#[test]
fn url_does_not_double_api_prefix() {
    assert_eq!(
        resolve_api_url("https://kaflow.example/api/", "chat/history").expect("valid base"),
        "https://kaflow.example/api/chat/history"
    );
}

#[test]
fn url_passes_absolute_paths_through() {
    assert_eq!(
        resolve_api_url("http://localhost:8102", "https://other.example/stream").expect("absolute"),
        "https://other.example/stream"
    );
}

#[test]
fn url_blank_base_uses_default() {
    assert_eq!(
        resolve_api_url("  ", "configs").expect("default base"),
        format!("{DEFAULT_BASE_URL}/api/configs")
    );
}

#[test]
fn url_rejects_garbage_base() {
    let error = resolve_api_url("not a url", "configs").expect_err("garbage base must fail");
    assert!(matches!(error, ApiError::InvalidBaseUrl(_)));
}
