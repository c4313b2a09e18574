use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Agent name used when a stream event does not carry one.
pub const DEFAULT_AGENT: &str = "assistant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Maps persisted role names (`human`/`user`, `ai`/`assistant`).
    #[must_use]
    pub fn from_wire(role: &str) -> Option<Self> {
        match role.trim().to_ascii_lowercase().as_str() {
            "human" | "user" => Some(Self::User),
            "ai" | "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Cancelled,
    Error,
}

impl FinishReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        }
    }

    /// Unrecognized strings carry no terminal meaning and map to `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "stop" => Some(Self::Stop),
            "cancelled" => Some(Self::Cancelled),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolCallStatus {
    Executing,
    Completed,
    Failed,
}

impl ToolCallStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Executing)
    }
}

/// One tool invocation and its current execution state.
///
/// Values are replaced wholesale; the settle helpers return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// Local correlation key: the server id, or `"{event_id}-{index}"`.
    pub id: String,
    pub tool_call_id: Option<String>,
    pub index: usize,
    pub name: String,
    pub args: Value,
    pub status: ToolCallStatus,
    pub result: Option<String>,
    pub tool_name: Option<String>,
    pub issued_at: OffsetDateTime,
    pub completed_at: Option<OffsetDateTime>,
}

impl ToolCall {
    #[must_use]
    pub fn executing(
        id: impl Into<String>,
        tool_call_id: Option<String>,
        index: usize,
        name: impl Into<String>,
        args: Value,
        issued_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: id.into(),
            tool_call_id,
            index,
            name: name.into(),
            args,
            status: ToolCallStatus::Executing,
            result: None,
            tool_name: None,
            issued_at,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.status == ToolCallStatus::Executing
    }

    #[must_use]
    pub fn completed(&self, result: impl Into<String>, at: OffsetDateTime) -> Self {
        self.settled(ToolCallStatus::Completed, result.into(), at)
    }

    #[must_use]
    pub fn failed(&self, result: impl Into<String>, at: OffsetDateTime) -> Self {
        self.settled(ToolCallStatus::Failed, result.into(), at)
    }

    fn settled(&self, status: ToolCallStatus, result: String, at: OffsetDateTime) -> Self {
        Self {
            status,
            result: Some(result),
            completed_at: Some(at),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text { content: String },
    ToolCall { tool_call: ToolCall },
}

impl ContentItem {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    #[must_use]
    pub fn tool_call(tool_call: ToolCall) -> Self {
        Self::ToolCall { tool_call }
    }

    #[must_use]
    pub fn as_tool_call(&self) -> Option<&ToolCall> {
        match self {
            Self::ToolCall { tool_call } => Some(tool_call),
            Self::Text { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub agent: Option<String>,
    pub thread_id: Option<String>,
    pub content_items: Vec<ContentItem>,
    pub streaming: bool,
    pub completed: bool,
    pub finish_reason: Option<FinishReason>,
    /// Flattened view of the tool calls held in `content_items`.
    pub tool_calls: Vec<ToolCall>,
    pub is_report: bool,
    pub last_run_id: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Message {
    /// A finished user turn holding a single text item.
    #[must_use]
    pub fn user(content: impl Into<String>, thread_id: Option<String>, now: OffsetDateTime) -> Self {
        let content = content.into();
        let content_items = if content.is_empty() {
            Vec::new()
        } else {
            vec![ContentItem::text(content)]
        };
        Self {
            id: new_message_id("user"),
            role: Role::User,
            agent: None,
            thread_id,
            content_items,
            streaming: false,
            completed: true,
            finish_reason: None,
            tool_calls: Vec::new(),
            is_report: false,
            last_run_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A fresh, open assistant message for `(thread_id, agent)`.
    #[must_use]
    pub fn open_assistant(
        thread_id: impl Into<String>,
        agent: impl Into<String>,
        run_id: Option<String>,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: new_message_id("assistant"),
            role: Role::Assistant,
            agent: Some(agent.into()),
            thread_id: Some(thread_id.into()),
            content_items: Vec::new(),
            streaming: true,
            completed: false,
            finish_reason: None,
            tool_calls: Vec::new(),
            is_report: false,
            last_run_id: run_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Concatenation of all text items in order.
    #[must_use]
    pub fn text(&self) -> String {
        self.content_items
            .iter()
            .filter_map(|item| match item {
                ContentItem::Text { content } => Some(content.as_str()),
                ContentItem::ToolCall { .. } => None,
            })
            .collect()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.role == Role::Assistant && !self.completed
    }

    /// Append text to the trailing text item, or start a new one after a tool call.
    pub fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.content_items.last_mut() {
            Some(ContentItem::Text { content }) => content.push_str(text),
            _ => self.content_items.push(ContentItem::text(text)),
        }
    }

    /// True when an embedded tool call keyed `key` is still executing.
    #[must_use]
    pub fn awaits_tool_call(&self, key: &str) -> bool {
        self.content_items
            .iter()
            .filter_map(ContentItem::as_tool_call)
            .any(|tool_call| tool_call.id == key && tool_call.is_executing())
    }

    /// Rebuild `tool_calls` from `content_items`.
    pub fn refresh_tool_calls(&mut self) {
        self.tool_calls = self
            .content_items
            .iter()
            .filter_map(ContentItem::as_tool_call)
            .cloned()
            .collect();
    }

    #[must_use]
    pub fn content_view(&self) -> MessageView {
        MessageView {
            role: self.role,
            agent: self.agent.clone(),
            thread_id: self.thread_id.clone(),
            items: self.content_items.iter().map(ItemView::from).collect(),
            streaming: self.streaming,
            completed: self.completed,
            finish_reason: self.finish_reason,
            is_report: self.is_report,
        }
    }
}

/// Message fields that survive re-assembly; ids and timestamps are excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageView {
    pub role: Role,
    pub agent: Option<String>,
    pub thread_id: Option<String>,
    pub items: Vec<ItemView>,
    pub streaming: bool,
    pub completed: bool,
    pub finish_reason: Option<FinishReason>,
    pub is_report: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemView {
    Text(String),
    ToolCall {
        id: String,
        name: String,
        args: Value,
        status: ToolCallStatus,
        result: Option<String>,
    },
}

impl From<&ContentItem> for ItemView {
    fn from(item: &ContentItem) -> Self {
        match item {
            ContentItem::Text { content } => Self::Text(content.clone()),
            ContentItem::ToolCall { tool_call } => Self::ToolCall {
                id: tool_call.id.clone(),
                name: tool_call.name.clone(),
                args: tool_call.args.clone(),
                status: tool_call.status,
                result: tool_call.result.clone(),
            },
        }
    }
}

#[must_use]
pub fn new_message_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}
