use std::sync::Arc;

use chat_protocol::ChatRequest;
use futures_util::StreamExt;
use kaflow_api::{
    ApiError, CancelSignal, ChatApiClient, EventStream, StreamAbortHandle, StreamTransport,
    CHAT_STREAM_PATH,
};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use transcript::{Message, TranscriptError, TranscriptStore};
use uuid::Uuid;

use crate::backfill::HistoryBackfill;
use crate::error::SessionError;

/// Outcome of pulling one item off the open stream.
#[derive(Debug)]
pub enum SessionUpdate {
    /// An event was decoded and handed to the reducer.
    Applied { event: String, changed: bool },
    /// The event payload did not decode; the transcript is unchanged.
    Malformed(TranscriptError),
    /// The server closed the stream.
    Finished,
    /// The stream was aborted; open work was finalized as cancelled.
    Cancelled,
    /// The transport failed; open work was finalized as an error.
    Failed(ApiError),
    /// No stream is open.
    Idle,
}

impl SessionUpdate {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Cancelled | Self::Failed(_) | Self::Idle
        )
    }
}

/// Fresh conversation id, prefixed with the user name when one is known.
#[must_use]
pub fn new_thread_id(username: Option<&str>) -> String {
    let id = Uuid::new_v4();
    match username.map(str::trim).filter(|name| !name.is_empty()) {
        Some(username) => format!("{username}_{id}"),
        None => id.to_string(),
    }
}

/// One conversation: its transcript, registry and at most one open stream.
///
/// All transcript changes happen through `&mut self` on the owning task;
/// other tasks can only abort the stream via [`ChatSession::abort_handle`].
#[derive(Debug)]
pub struct ChatSession {
    transport: StreamTransport,
    stream: Option<EventStream>,
    store: TranscriptStore,
    thread_id: String,
    config_id: i64,
    username: Option<String>,
}

impl ChatSession {
    pub fn new(client: Arc<ChatApiClient>, config_id: i64) -> Self {
        Self {
            transport: StreamTransport::new(client),
            stream: None,
            store: TranscriptStore::new(),
            thread_id: new_thread_id(None),
            config_id,
            username: None,
        }
    }

    /// Continue an existing thread instead of starting a fresh one.
    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = thread_id.into();
        self
    }

    /// Prefix for generated thread ids; applies from the next `new_thread`.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn client(&self) -> &Arc<ChatApiClient> {
        self.transport.client()
    }

    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    #[must_use]
    pub fn config_id(&self) -> i64 {
        self.config_id
    }

    pub fn set_config_id(&mut self, config_id: i64) {
        self.config_id = config_id;
    }

    #[must_use]
    pub fn store(&self) -> &TranscriptStore {
        &self.store
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.store.last_error()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn add_user_message(&mut self, text: &str) {
        self.store
            .add_user_message(text, Some(self.thread_id.clone()), OffsetDateTime::now_utc());
    }

    /// Start a turn. Any turn still open is finalized as cancelled first.
    /// Blank text is rejected; anything else is sent as typed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send(&mut self, text: &str) -> Result<(), SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        self.disconnect();
        self.add_user_message(text);
        self.store.begin_turn();

        let request = ChatRequest::user_turn(text, self.config_id, self.thread_id.clone());
        match self.transport.open(CHAT_STREAM_PATH, &request) {
            Ok(stream) => {
                info!(thread_id = %self.thread_id, config_id = self.config_id, "chat turn started");
                self.stream = Some(stream);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "failed to open chat stream");
                self.store
                    .fail_open(&error.to_string(), OffsetDateTime::now_utc());
                Err(SessionError::Transport(error))
            }
        }
    }

    /// Wait for the next stream item and apply it.
    pub async fn next_update(&mut self) -> SessionUpdate {
        let Some(stream) = self.stream.as_mut() else {
            return SessionUpdate::Idle;
        };

        let item = stream.next().await;
        let now = OffsetDateTime::now_utc();
        match item {
            Some(Ok(event)) => match self.store.apply_raw(&event.event, event.data.as_deref(), now) {
                Ok(applied) => SessionUpdate::Applied {
                    event: event.event,
                    changed: applied.changed(),
                },
                Err(error) => SessionUpdate::Malformed(error),
            },
            Some(Err(error)) => {
                self.stream = None;
                self.store.fail_open(&error.to_string(), now);
                SessionUpdate::Failed(error)
            }
            None => {
                let cancelled = stream.was_cancelled();
                self.stream = None;
                if cancelled {
                    self.store.abort_open(now);
                    debug!(thread_id = %self.thread_id, "chat stream aborted");
                    SessionUpdate::Cancelled
                } else {
                    debug!(thread_id = %self.thread_id, "chat stream finished");
                    SessionUpdate::Finished
                }
            }
        }
    }

    /// Drive the open stream until it ends. Cancellation is not an error.
    pub async fn run_to_end(&mut self) -> Result<(), SessionError> {
        loop {
            match self.next_update().await {
                SessionUpdate::Failed(error) => return Err(SessionError::Transport(error)),
                update if update.is_terminal() => return Ok(()),
                _ => {}
            }
        }
    }

    /// Abort the open stream and finalize any open message as cancelled.
    /// Returns whether anything was open.
    pub fn disconnect(&mut self) -> bool {
        let aborted = self.transport.abort();
        let had_stream = self.stream.take().is_some();
        let finalized = self.store.abort_open(OffsetDateTime::now_utc()).changed();
        if aborted || had_stream || finalized {
            debug!(thread_id = %self.thread_id, finalized, "chat stream disconnected");
        }
        aborted || had_stream || finalized
    }

    /// Abort handle for the stream currently open, usable from any task.
    #[must_use]
    pub fn abort_handle(&self) -> Option<StreamAbortHandle> {
        self.stream.as_ref().map(EventStream::abort_handle)
    }

    pub fn clear(&mut self) {
        self.stop_stream();
        self.store.reset();
    }

    /// Start a new conversation with a fresh thread id.
    pub fn new_thread(&mut self) -> &str {
        self.clear();
        self.thread_id = new_thread_id(self.username.as_deref());
        info!(thread_id = %self.thread_id, "new thread");
        &self.thread_id
    }

    pub fn set_history(&mut self, messages: Vec<Message>) {
        self.stop_stream();
        self.store.seed(messages);
    }

    /// Load this thread's full history and replace the transcript with it.
    pub async fn load_history(
        &mut self,
        page_size: u32,
        cancellation: Option<&CancelSignal>,
    ) -> Result<usize, SessionError> {
        let mut backfill = HistoryBackfill::new(self.thread_id.clone(), page_size);
        let messages = backfill
            .load_all(self.transport.client(), cancellation)
            .await?;
        let loaded = messages.len();
        self.set_history(messages);
        info!(thread_id = %self.thread_id, loaded, "history loaded");
        Ok(loaded)
    }

    fn stop_stream(&mut self) {
        self.transport.abort();
        self.stream = None;
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.transport.abort();
    }
}
