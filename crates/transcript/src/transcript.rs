use std::collections::HashMap;

use crate::model::{Message, MessageView, Role};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OpenKey {
    thread_id: String,
    agent: String,
}

impl OpenKey {
    fn new(thread_id: &str, agent: &str) -> Self {
        Self {
            thread_id: thread_id.to_owned(),
            agent: agent.to_owned(),
        }
    }

    fn of(message: &Message) -> Option<Self> {
        if !message.is_open() {
            return None;
        }
        Some(Self::new(
            message.thread_id.as_deref().unwrap_or_default(),
            message.agent.as_deref().unwrap_or_default(),
        ))
    }
}

/// Ordered messages plus the index of open assistant messages.
///
/// Messages are appended; the only in-place edits are whole-value
/// replacements made through [`Transcript::replace`].
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    open: HashMap<OpenKey, usize>,
    last_error: Option<String>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        let mut transcript = Self::default();
        for message in messages {
            transcript.push(message);
        }
        transcript
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Message> {
        self.messages.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    /// Index of the most recent uncompleted assistant message for the pair.
    #[must_use]
    pub fn find_open(&self, thread_id: &str, agent: &str) -> Option<usize> {
        self.open.get(&OpenKey::new(thread_id, agent)).copied()
    }

    /// Most recent assistant message that is still streaming.
    #[must_use]
    pub fn last_streaming(&self) -> Option<usize> {
        self.messages
            .iter()
            .rposition(|message| message.is_open() && message.streaming)
    }

    /// Most recent assistant message that is not completed.
    #[must_use]
    pub fn last_open(&self) -> Option<usize> {
        self.messages.iter().rposition(Message::is_open)
    }

    pub fn push(&mut self, message: Message) -> usize {
        let index = self.messages.len();
        if let Some(key) = OpenKey::of(&message) {
            self.open.insert(key, index);
        }
        self.messages.push(message);
        index
    }

    /// Swap in a new value for the message at `index`, keeping the open index
    /// in step. Returns `false` when `index` is out of range.
    pub fn replace(&mut self, index: usize, message: Message) -> bool {
        let Some(slot) = self.messages.get_mut(index) else {
            return false;
        };

        if let Some(key) = OpenKey::of(slot) {
            if self.open.get(&key) == Some(&index) {
                self.open.remove(&key);
            }
        }
        if let Some(key) = OpenKey::of(&message) {
            self.open.insert(key, index);
        }
        *slot = message;
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.open.clear();
        self.last_error = None;
    }

    #[must_use]
    pub fn content_view(&self) -> Vec<MessageView> {
        self.messages.iter().map(Message::content_view).collect()
    }

    /// Number of messages with the given role.
    #[must_use]
    pub fn count_role(&self, role: Role) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role == role)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::Transcript;
    use crate::model::Message;

    fn scan_open(transcript: &Transcript, thread_id: &str, agent: &str) -> Option<usize> {
        transcript.messages().iter().rposition(|message| {
            message.is_open()
                && message.thread_id.as_deref() == Some(thread_id)
                && message.agent.as_deref() == Some(agent)
        })
    }

    #[test]
    fn open_index_tracks_replacements() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let mut transcript = Transcript::new();
        let first = transcript.push(Message::open_assistant("t1", "a", None, now));
        transcript.push(Message::open_assistant("t1", "b", None, now));

        assert_eq!(transcript.find_open("t1", "a"), scan_open(&transcript, "t1", "a"));

        let mut closed = transcript.messages()[first].clone();
        closed.streaming = false;
        closed.completed = true;
        assert!(transcript.replace(first, closed));

        assert_eq!(transcript.find_open("t1", "a"), None);
        assert_eq!(transcript.find_open("t1", "b"), Some(1));
        assert_eq!(transcript.find_open("t1", "b"), scan_open(&transcript, "t1", "b"));
        assert_eq!(transcript.last_open(), Some(1));
    }

    #[test]
    fn user_messages_are_never_open() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("hi", Some("t1".into()), OffsetDateTime::UNIX_EPOCH));
        assert_eq!(transcript.last_open(), None);
        assert!(!transcript.replace(5, Message::user("x", None, OffsetDateTime::UNIX_EPOCH)));
    }
}
