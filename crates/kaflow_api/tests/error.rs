use reqwest::StatusCode;

use kaflow_api::parse_error_message;

#[test]
fn parse_error_message_reads_nested_error_message() {
    let body = r#"{"error":{"code":"bad_request","message":"invalid config"}}"#;
    assert_eq!(parse_error_message(StatusCode::BAD_REQUEST, body), "invalid config");
}

#[test]
fn parse_error_message_reads_string_error_and_detail() {
    assert_eq!(
        parse_error_message(StatusCode::NOT_FOUND, r#"{"error":"thread not found"}"#),
        "thread not found"
    );
    assert_eq!(
        parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"graph crashed"}"#),
        "graph crashed"
    );
}

#[test]
fn parse_error_message_joins_validation_details() {
    let body = r#"{"detail":[{"loc":["body","thread_id"],"msg":"field required"},{"msg":"bad page"}]}"#;
    assert_eq!(
        parse_error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
        "field required; bad page"
    );
}

#[test]
fn parse_error_message_falls_back_to_raw_body_or_reason() {
    assert_eq!(
        parse_error_message(StatusCode::INTERNAL_SERVER_ERROR, "raw failure text"),
        "raw failure text"
    );
    assert_eq!(
        parse_error_message(StatusCode::SERVICE_UNAVAILABLE, ""),
        "Service Unavailable"
    );
}
