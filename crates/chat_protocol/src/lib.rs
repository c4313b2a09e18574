//! Wire contract shared by the KaFlow chat transport, transcript reducer and
//! history assembler.
//!
//! This crate only defines payload shapes and stream-event decoding. It has no
//! HTTP, no transcript state and no runtime coupling.

pub mod configs;
pub mod events;
pub mod history;
pub mod request;
pub mod threads;

pub use configs::{ConfigItem, ConfigsResponse};
pub use events::{
    ErrorEvent, EventDecodeError, FinalReportEvent, MessageChunkEvent, StreamEvent,
    ToolCallResultEvent, ToolCallsEvent, WireFunction, WireToolCall,
};
pub use history::{
    Checkpoint, HistoryMessage, HistoryRequest, HistoryResponse, SortOrder, DEFAULT_PAGE_SIZE,
};
pub use request::{ChatMessage, ChatRequest};
pub use threads::{Thread, ThreadsRequest, ThreadsResponse};

/// Renders an arbitrary JSON value as display text.
///
/// Strings are returned verbatim, `null` becomes empty, and everything else is
/// serialized compactly.
#[must_use]
pub fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
