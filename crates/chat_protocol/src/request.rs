use serde::{Deserialize, Serialize};

/// One prior message carried in a chat request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_owned(),
            content: content.into(),
        }
    }
}

/// Body of `POST chat/stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub config_id: i64,
    pub thread_id: String,
}

impl ChatRequest {
    /// Single-turn request: the server keeps prior turns per `thread_id`.
    #[must_use]
    pub fn user_turn(content: impl Into<String>, config_id: i64, thread_id: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(content)],
            config_id,
            thread_id: thread_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ChatRequest;

    #[test]
    fn user_turn_serializes_wire_shape() {
        let request = ChatRequest::user_turn("hi", 3, "t-1");
        assert_eq!(
            serde_json::to_value(&request).expect("request serializes"),
            json!({
                "messages": [{"role": "user", "content": "hi"}],
                "config_id": 3,
                "thread_id": "t-1",
            })
        );
    }
}
