//! Client-side core for KaFlow streaming chat.
//!
//! # Crates
//! - [`chat_protocol`]: wire payloads and stream-event decoding.
//! - [`kaflow_api`]: HTTP client, SSE parser and cancelable stream transport.
//! - [`transcript`]: messages, tool-call registry, reducer and history assembler.
//! - [`chat_session`]: per-conversation owner tying transport to transcript.
//!
//! This crate re-exports the common surface and adds environment
//! configuration ([`config::EnvConfig`]) and logging bootstrap
//! ([`logging::init_logging`]).

pub mod config;
pub mod logging;

pub use chat_protocol;
pub use chat_session;
pub use kaflow_api;
pub use transcript;

/// Session orchestration.
pub use chat_session::{new_thread_id, ChatSession, HistoryBackfill, SessionError, SessionUpdate};
/// Transport and API client.
pub use kaflow_api::{ApiConfig, ApiError, ChatApiClient, StreamAbortHandle};
/// Transcript model.
pub use transcript::{
    ContentItem, FinishReason, Message, Role, ToolCall, ToolCallStatus, TranscriptError,
    TranscriptStore,
};
