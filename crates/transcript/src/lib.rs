//! Transcript state for streamed chat turns.
//!
//! [`TranscriptStore`] owns a [`Transcript`] and the [`ToolCallRegistry`] of
//! the current tool batch. Live stream events go through [`reducer`];
//! persisted checkpoints go through [`history::assemble`]. Both produce the
//! same [`Message`] shape.

pub mod args;
pub mod error;
pub mod history;
pub mod model;
pub mod reducer;
pub mod registry;
pub mod store;
pub mod transcript;

pub use args::{parse_tool_arguments, tool_arguments_or_empty};
pub use error::TranscriptError;
pub use history::assemble;
pub use model::{
    new_message_id, ContentItem, FinishReason, ItemView, Message, MessageView, Role, ToolCall,
    ToolCallStatus, DEFAULT_AGENT,
};
pub use reducer::{Applied, Finalization, CANCELLED_TOOL_RESULT, UNKNOWN_TOOL_NAME};
pub use registry::ToolCallRegistry;
pub use store::TranscriptStore;
pub use transcript::Transcript;
