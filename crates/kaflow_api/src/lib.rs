//! Transport-only KaFlow chat API client primitives.
//!
//! This crate owns request building, SSE framing and the cancelable stream
//! transport for the chat endpoints. It holds no transcript state; decoded
//! payload shapes live in `chat_protocol`.
//!
//! Nothing here retries. A failed request or stream is reported once and any
//! retry is a new caller-initiated action.

pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod sse;
pub mod transport;
pub mod url;

pub use client::{
    CancelSignal, ChatApiClient, CHAT_HISTORY_PATH, CHAT_STREAM_PATH, CHAT_THREADS_PATH,
    CONFIGS_PATH,
};
pub use config::ApiConfig;
pub use error::{parse_error_message, ApiError};
pub use sse::{SseEvent, SseStreamParser, DEFAULT_EVENT_NAME};
pub use transport::{EventStream, StreamAbortHandle, StreamTransport};
pub use url::{resolve_api_url, DEFAULT_BASE_URL};
