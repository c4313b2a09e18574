use serde_json::{Map, Value};
use tracing::warn;

use crate::error::TranscriptError;

/// Structured tool arguments from the raw wire value.
///
/// String-encoded JSON is decoded; a blank string or a missing value yields an
/// empty object.
pub fn parse_tool_arguments(tool_call_id: &str, raw: Option<&Value>) -> Result<Value, TranscriptError> {
    match raw {
        None | Some(Value::Null) => Ok(empty_arguments()),
        Some(Value::String(encoded)) if encoded.trim().is_empty() => Ok(empty_arguments()),
        Some(Value::String(encoded)) => serde_json::from_str(encoded)
            .map_err(|source| TranscriptError::tool_arguments(tool_call_id, source)),
        Some(structured) => Ok(structured.clone()),
    }
}

/// Like [`parse_tool_arguments`], but logs the failure and falls back to `{}`.
pub fn tool_arguments_or_empty(tool_call_id: &str, raw: Option<&Value>) -> Value {
    parse_tool_arguments(tool_call_id, raw).unwrap_or_else(|error| {
        warn!(%error, "using empty tool arguments");
        empty_arguments()
    })
}

fn empty_arguments() -> Value {
    Value::Object(Map::new())
}
