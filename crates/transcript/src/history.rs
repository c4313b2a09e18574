//! Rebuilds a transcript from persisted checkpoints.

use std::collections::{HashMap, HashSet};

use chat_protocol::{Checkpoint, HistoryMessage, WireToolCall};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::args::tool_arguments_or_empty;
use crate::error::TranscriptError;
use crate::model::{new_message_id, ContentItem, Message, Role, ToolCall, ToolCallStatus};
use crate::reducer::UNKNOWN_TOOL_NAME;

const TOOL_ROLE: &str = "tool";

struct ToolResult {
    content: String,
    at: OffsetDateTime,
}

/// Convert checkpoints, oldest first, into finished transcript messages.
///
/// Tool-role messages are folded into the tool calls they answer. A message
/// whose `(role, text)` already appeared earlier is dropped; messages without
/// text are told apart by their tool-call ids.
#[must_use]
pub fn assemble(checkpoints: &[Checkpoint], now: OffsetDateTime) -> Vec<Message> {
    let results = index_tool_results(checkpoints, now);
    let mut seen: HashSet<(Role, String, Vec<String>)> = HashSet::new();
    let mut messages = Vec::new();

    for checkpoint in checkpoints {
        let at = checkpoint_time(checkpoint, now);
        for (position, raw) in checkpoint.messages.iter().enumerate() {
            let role_name = role_name(raw);
            if role_name == TOOL_ROLE {
                continue;
            }
            let Some(role) = Role::from_wire(role_name) else {
                let error = TranscriptError::UnknownRole {
                    role: role_name.to_owned(),
                    checkpoint_id: checkpoint.checkpoint_id.clone(),
                };
                warn!(%error, "skipping history message");
                continue;
            };

            let text = raw.content_text();
            if !seen.insert(dedup_key(role, &text, raw)) {
                continue;
            }

            let message = match role {
                Role::User => Message {
                    id: new_message_id("history"),
                    ..Message::user(text, None, at)
                },
                Role::Assistant => {
                    assistant_message(checkpoint, position, raw, text, &results, at)
                }
            };
            messages.push(message);
        }
    }

    debug!(
        checkpoints = checkpoints.len(),
        messages = messages.len(),
        "history assembled"
    );
    messages
}

fn index_tool_results(checkpoints: &[Checkpoint], now: OffsetDateTime) -> HashMap<String, ToolResult> {
    let mut results = HashMap::new();
    for checkpoint in checkpoints {
        let at = checkpoint_time(checkpoint, now);
        for raw in &checkpoint.messages {
            if role_name(raw) != TOOL_ROLE {
                continue;
            }
            let Some(id) = raw.tool_call_id.as_deref().filter(|id| !id.trim().is_empty()) else {
                continue;
            };
            results.entry(id.to_owned()).or_insert_with(|| ToolResult {
                content: raw.content_text(),
                at,
            });
        }
    }
    results
}

fn assistant_message(
    checkpoint: &Checkpoint,
    position: usize,
    raw: &HistoryMessage,
    text: String,
    results: &HashMap<String, ToolResult>,
    at: OffsetDateTime,
) -> Message {
    let mut content_items = Vec::new();
    if !text.is_empty() {
        content_items.push(ContentItem::text(text));
    }

    for (index, descriptor) in raw.tool_call_descriptors().iter().enumerate() {
        let call: WireToolCall = match serde_json::from_value(descriptor.clone()) {
            Ok(call) => call,
            Err(error) => {
                warn!(%error, checkpoint_id = %checkpoint.checkpoint_id, "skipping tool call descriptor");
                continue;
            }
        };
        let key = call
            .call_id()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("{}-{position}-{index}", checkpoint.checkpoint_id));
        let args = tool_arguments_or_empty(&key, call.raw_arguments());
        let mut tool_call = ToolCall::executing(
            key,
            call.call_id().map(ToOwned::to_owned),
            index,
            call.tool_name().unwrap_or(UNKNOWN_TOOL_NAME),
            args,
            at,
        );
        if let Some(result) = call.call_id().and_then(|id| results.get(id)) {
            tool_call.status = ToolCallStatus::Completed;
            tool_call.result = Some(result.content.clone());
            tool_call.completed_at = Some(result.at);
        }
        content_items.push(ContentItem::tool_call(tool_call));
    }

    let mut message = Message {
        id: new_message_id("history"),
        role: Role::Assistant,
        agent: None,
        thread_id: None,
        content_items,
        streaming: false,
        completed: true,
        finish_reason: None,
        tool_calls: Vec::new(),
        is_report: false,
        last_run_id: None,
        created_at: at,
        updated_at: at,
    };
    message.refresh_tool_calls();
    message
}

fn dedup_key(role: Role, text: &str, raw: &HistoryMessage) -> (Role, String, Vec<String>) {
    let tool_call_ids = if text.is_empty() {
        raw.tool_call_descriptors()
            .iter()
            .filter_map(|descriptor| descriptor.get("id").and_then(Value::as_str))
            .map(ToOwned::to_owned)
            .collect()
    } else {
        Vec::new()
    };
    (role, text.to_owned(), tool_call_ids)
}

fn role_name(raw: &HistoryMessage) -> &str {
    let role = raw.role.trim();
    if role.is_empty() {
        raw.kind.as_deref().map(str::trim).unwrap_or_default()
    } else {
        role
    }
}

fn checkpoint_time(checkpoint: &Checkpoint, fallback: OffsetDateTime) -> OffsetDateTime {
    checkpoint
        .created_at
        .as_deref()
        .and_then(|created_at| OffsetDateTime::parse(created_at, &Rfc3339).ok())
        .unwrap_or(fallback)
}
