//! Conversation-level orchestration for KaFlow chat.
//!
//! [`ChatSession`] ties a [`kaflow_api::StreamTransport`] to a
//! [`transcript::TranscriptStore`]: it opens one stream per turn, applies
//! events in arrival order and finalizes open work on abort or failure.
//! [`HistoryBackfill`] pages a thread's stored checkpoints into the same
//! message shape.

pub mod backfill;
pub mod error;
pub mod session;

pub use backfill::HistoryBackfill;
pub use error::SessionError;
pub use session::{new_thread_id, ChatSession, SessionUpdate};
