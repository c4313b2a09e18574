use chat_protocol::EventDecodeError;
use thiserror::Error;

/// Recoverable parsing-level failures. None of these abort the surrounding
/// operation; callers log them and continue.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error(transparent)]
    MalformedEvent(#[from] EventDecodeError),

    #[error("unknown history role '{role}' in checkpoint {checkpoint_id}")]
    UnknownRole { role: String, checkpoint_id: String },

    #[error("unparseable arguments for tool call {tool_call_id}: {source}")]
    ToolArguments {
        tool_call_id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TranscriptError {
    #[must_use]
    pub fn tool_arguments(tool_call_id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::ToolArguments {
            tool_call_id: tool_call_id.into(),
            source,
        }
    }
}
