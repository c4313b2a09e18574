use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const EVENT_MESSAGE_CHUNK: &str = "message_chunk";
pub const EVENT_TOOL_CALLS: &str = "tool_calls";
pub const EVENT_TOOL_CALL_RESULT: &str = "tool_call_result";
pub const EVENT_FINAL_REPORT: &str = "final_report";
pub const EVENT_CANCELLED: &str = "cancelled";
pub const EVENT_ERROR: &str = "error";

/// Incremental assistant text for one (thread, agent) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageChunkEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Function descriptor nested inside a wire tool call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    #[serde(default)]
    pub name: Option<String>,
    /// Either a JSON-encoded string or an already structured value.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// One tool invocation as announced by the server.
///
/// Both the flat (`name`/`args`) and the nested (`function.name`/`function.arguments`)
/// shapes appear on the wire; accessors prefer the flat fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub function: Option<WireFunction>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl WireToolCall {
    /// Non-empty server id, if any.
    #[must_use]
    pub fn call_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }

    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.function
                    .as_ref()
                    .and_then(|function| function.name.as_deref())
                    .filter(|name| !name.is_empty())
            })
    }

    #[must_use]
    pub fn raw_arguments(&self) -> Option<&Value> {
        self.args.as_ref().filter(|args| !args.is_null()).or_else(|| {
            self.function
                .as_ref()
                .and_then(|function| function.arguments.as_ref())
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallsEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    /// `None` when the field is absent or not an array; such batches are ignored.
    #[serde(default, deserialize_with = "deserialize_tool_calls")]
    pub tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResultEvent {
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub tool_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReportEvent {
    #[serde(default)]
    pub report: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

impl ErrorEvent {
    pub const FALLBACK_MESSAGE: &'static str = "unknown error";

    /// `error`, then `message`, then a fixed fallback.
    #[must_use]
    pub fn message_text(&self) -> String {
        [self.error.as_ref(), self.message.as_ref()]
            .into_iter()
            .flatten()
            .map(crate::value_to_text)
            .find(|text| !text.trim().is_empty())
            .unwrap_or_else(|| Self::FALLBACK_MESSAGE.to_owned())
    }
}

/// Stream event after name dispatch and payload decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    MessageChunk(MessageChunkEvent),
    ToolCalls(ToolCallsEvent),
    ToolCallResult(ToolCallResultEvent),
    FinalReport(FinalReportEvent),
    Cancelled,
    Error(ErrorEvent),
    /// Unrecognized event name, kept for forward compatibility.
    Unknown { name: String },
}

#[derive(Debug, Error)]
#[error("malformed `{event}` event payload: {source}")]
pub struct EventDecodeError {
    pub event: String,
    #[source]
    pub source: serde_json::Error,
}

impl StreamEvent {
    /// Decodes one SSE event by name.
    ///
    /// `cancelled` and `error` may omit `data`; the other recognized events
    /// require a payload.
    /// Unknown names are returned without inspecting their payload.
    pub fn decode(name: &str, data: Option<&str>) -> Result<Self, EventDecodeError> {
        let known = matches!(
            name,
            EVENT_MESSAGE_CHUNK
                | EVENT_TOOL_CALLS
                | EVENT_TOOL_CALL_RESULT
                | EVENT_FINAL_REPORT
                | EVENT_CANCELLED
                | EVENT_ERROR
        );
        if !known {
            return Ok(Self::Unknown {
                name: name.to_owned(),
            });
        }

        let payload = match data.map(str::trim).filter(|data| !data.is_empty()) {
            Some(data) => serde_json::from_str::<Value>(data).map_err(|source| EventDecodeError {
                event: name.to_owned(),
                source,
            })?,
            None if matches!(name, EVENT_CANCELLED | EVENT_ERROR) => {
                Value::Object(Default::default())
            }
            None => {
                return Err(EventDecodeError {
                    event: name.to_owned(),
                    source: serde::de::Error::custom("event has no data"),
                })
            }
        };
        let typed = |source| EventDecodeError {
            event: name.to_owned(),
            source,
        };

        Ok(match name {
            EVENT_MESSAGE_CHUNK => Self::MessageChunk(serde_json::from_value(payload).map_err(typed)?),
            EVENT_TOOL_CALLS => Self::ToolCalls(serde_json::from_value(payload).map_err(typed)?),
            EVENT_TOOL_CALL_RESULT => {
                Self::ToolCallResult(serde_json::from_value(payload).map_err(typed)?)
            }
            EVENT_FINAL_REPORT => Self::FinalReport(serde_json::from_value(payload).map_err(typed)?),
            EVENT_CANCELLED => Self::Cancelled,
            _ => Self::Error(serde_json::from_value(payload).map_err(typed)?),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::MessageChunk(_) => EVENT_MESSAGE_CHUNK,
            Self::ToolCalls(_) => EVENT_TOOL_CALLS,
            Self::ToolCallResult(_) => EVENT_TOOL_CALL_RESULT,
            Self::FinalReport(_) => EVENT_FINAL_REPORT,
            Self::Cancelled => EVENT_CANCELLED,
            Self::Error(_) => EVENT_ERROR,
            Self::Unknown { name } => name,
        }
    }
}

fn deserialize_tool_calls<'de, D>(deserializer: D) -> Result<Option<Vec<WireToolCall>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        _ => Ok(None),
    }
}
