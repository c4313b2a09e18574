use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Body of `POST chat/history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRequest {
    pub thread_id: String,
    pub page: u32,
    pub page_size: u32,
    pub order: SortOrder,
}

impl HistoryRequest {
    #[must_use]
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order: SortOrder::Desc,
        }
    }

    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Raw message persisted inside a checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    /// Usually a string; structured content arrives as an array of parts.
    #[serde(default)]
    pub content: Value,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub additional_kwargs: Option<Value>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HistoryMessage {
    /// Flattens `content` to text: strings verbatim, arrays by concatenating
    /// their string parts and `text` fields.
    #[must_use]
    pub fn content_text(&self) -> String {
        match &self.content {
            Value::Array(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    Value::Object(map) => map.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect(),
            other => crate::value_to_text(other),
        }
    }

    /// Tool-call descriptors from `additional_kwargs.tool_calls`.
    #[must_use]
    pub fn tool_call_descriptors(&self) -> &[Value] {
        self.additional_kwargs
            .as_ref()
            .and_then(|kwargs| kwargs.get("tool_calls"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub checkpoint_id: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<HistoryMessage>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<Checkpoint>,
    #[serde(default)]
    pub config_id: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{HistoryMessage, HistoryRequest, HistoryResponse, SortOrder};

    #[test]
    fn request_defaults_match_server_defaults() {
        let request = HistoryRequest::new("t-1");
        assert_eq!(
            serde_json::to_value(&request).expect("request serializes"),
            json!({"thread_id": "t-1", "page": 1, "page_size": 10, "order": "desc"})
        );
        let asc = HistoryRequest::new("t-1").with_order(SortOrder::Asc).with_page(0);
        assert_eq!(asc.page, 1);
        assert_eq!(asc.order, SortOrder::Asc);
    }

    #[test]
    fn response_tolerates_missing_optional_fields() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "thread_id": "t-1",
            "total": 1,
            "page": 1,
            "page_size": 10,
            "total_pages": 1,
            "messages": [{
                "checkpoint_id": "c1",
                "created_at": "2026-01-01T00:00:00Z",
                "messages": [{"role": "human", "content": "hi"}]
            }]
        }))
        .expect("response decodes");

        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].messages[0].content_text(), "hi");
        assert!(response.error.is_none());
    }

    #[test]
    fn null_fields_decode_as_empty_values() {
        let response: HistoryResponse = serde_json::from_value(json!({
            "thread_id": "t-1",
            "messages": [
                {
                    "checkpoint_id": null,
                    "messages": [
                        {"role": null, "type": "ai", "content": "ok", "tool_call_id": null, "timestamp": null}
                    ]
                },
                {"checkpoint_id": "c2", "messages": null}
            ]
        }))
        .expect("nulls are tolerated");

        let first = &response.messages[0];
        assert_eq!(first.checkpoint_id, "");
        assert_eq!(first.messages[0].role, "");
        assert_eq!(first.messages[0].kind.as_deref(), Some("ai"));
        assert!(first.messages[0].tool_call_id.is_none());
        assert!(response.messages[1].messages.is_empty());
    }

    #[test]
    fn content_text_flattens_structured_parts() {
        let message = HistoryMessage {
            role: "ai".to_string(),
            content: json!([{"type": "text", "text": "a"}, "b", {"type": "image"}]),
            ..HistoryMessage::default()
        };
        assert_eq!(message.content_text(), "ab");
    }

    #[test]
    fn tool_call_descriptors_default_to_empty() {
        let message = HistoryMessage {
            role: "ai".to_string(),
            additional_kwargs: Some(json!({"tool_calls": [{"id": "c1"}]})),
            ..HistoryMessage::default()
        };
        assert_eq!(message.tool_call_descriptors().len(), 1);
        assert!(HistoryMessage::default().tool_call_descriptors().is_empty());
    }
}
