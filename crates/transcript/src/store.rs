use chat_protocol::StreamEvent;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::error::TranscriptError;
use crate::model::Message;
use crate::reducer::{self, Applied};
use crate::registry::ToolCallRegistry;
use crate::transcript::Transcript;

/// The transcript of one conversation together with its tool-call registry.
///
/// Both are reset together; nothing outside this value holds either.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    transcript: Transcript,
    registry: ToolCallRegistry,
}

impl TranscriptStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            transcript: Transcript::from_messages(messages),
            registry: ToolCallRegistry::new(),
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn registry(&self) -> &ToolCallRegistry {
        &self.registry
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.transcript.messages()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.transcript.last_error()
    }

    pub fn apply(&mut self, event: &StreamEvent, now: OffsetDateTime) -> Applied {
        let applied = reducer::apply_event(&mut self.transcript, &mut self.registry, event, now);
        debug!(event = event.name(), changed = applied.changed(), "stream event applied");
        applied
    }

    /// Decode a raw SSE event and apply it.
    ///
    /// A payload that fails to decode leaves the messages untouched, is
    /// recorded as the transcript error and is returned to the caller.
    pub fn apply_raw(
        &mut self,
        name: &str,
        data: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<Applied, TranscriptError> {
        match StreamEvent::decode(name, data) {
            Ok(event) => Ok(self.apply(&event, now)),
            Err(error) => {
                let error = TranscriptError::from(error);
                warn!(%error, "skipping malformed stream event");
                self.transcript.set_error(error.to_string());
                Err(error)
            }
        }
    }

    pub fn add_user_message(&mut self, text: &str, thread_id: Option<String>, now: OffsetDateTime) {
        self.transcript.push(Message::user(text, thread_id, now));
    }

    /// Prepare for a new turn: the previous batch and error no longer apply.
    pub fn begin_turn(&mut self) {
        self.registry.clear();
        self.transcript.clear_error();
    }

    pub fn abort_open(&mut self, now: OffsetDateTime) -> Applied {
        reducer::abort_open(&mut self.transcript, &mut self.registry, now)
    }

    /// Transport failure: same finalization as a server `error` event.
    pub fn fail_open(&mut self, message: &str, now: OffsetDateTime) -> Applied {
        reducer::apply_error(&mut self.transcript, &mut self.registry, message, now)
    }

    pub fn reset(&mut self) {
        self.transcript.clear();
        self.registry.clear();
    }

    /// Replace everything with previously assembled messages.
    pub fn seed(&mut self, messages: Vec<Message>) {
        self.registry.clear();
        self.transcript = Transcript::from_messages(messages);
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::TranscriptStore;
    use crate::error::TranscriptError;
    use crate::reducer::Applied;

    #[test]
    fn malformed_payload_is_recorded_and_skipped() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut store = TranscriptStore::new();
        store
            .apply_raw("message_chunk", Some(r#"{"agent":"a","content":"hi","thread_id":"t"}"#), now)
            .expect("valid chunk");
        let before = store.transcript().content_view();

        let error = store
            .apply_raw("message_chunk", Some("{broken"), now)
            .expect_err("broken json");

        assert!(matches!(error, TranscriptError::MalformedEvent(_)));
        assert_eq!(store.transcript().content_view(), before);
        assert!(store.last_error().is_some_and(|error| error.contains("message_chunk")));
    }

    #[test]
    fn begin_turn_clears_error_but_keeps_messages() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut store = TranscriptStore::new();
        store.add_user_message("hello", None, now);
        assert_eq!(store.fail_open("boom", now), Applied::Unchanged);
        assert_eq!(store.last_error(), Some("boom"));

        store.begin_turn();
        assert_eq!(store.last_error(), None);
        assert_eq!(store.messages().len(), 1);

        store.reset();
        assert!(store.messages().is_empty());
    }
}
