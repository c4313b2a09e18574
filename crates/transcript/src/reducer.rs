//! State transitions from one decoded stream event to the next transcript.
//!
//! Every transition replaces whole values: a message or tool call is cloned,
//! edited and swapped back in, never patched through a shared reference.

use chat_protocol::{
    value_to_text, FinalReportEvent, MessageChunkEvent, StreamEvent, ToolCallResultEvent,
    ToolCallsEvent,
};
use time::OffsetDateTime;
use tracing::debug;

use crate::args::tool_arguments_or_empty;
use crate::model::{
    new_message_id, ContentItem, FinishReason, Message, Role, ToolCall, DEFAULT_AGENT,
};
use crate::registry::ToolCallRegistry;
use crate::transcript::Transcript;

/// Result stored on executing tool calls when their turn is cancelled.
pub const CANCELLED_TOOL_RESULT: &str = "[cancelled]";
/// Name used for tool calls announced without one.
pub const UNKNOWN_TOOL_NAME: &str = "unknown_tool";

const TOOL_BATCH_FALLBACK_ID: &str = "tool-batch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Changed,
    Unchanged,
}

impl Applied {
    #[must_use]
    pub fn changed(self) -> bool {
        self == Self::Changed
    }
}

/// How open work is closed when a turn ends early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finalization {
    Cancelled,
    Failed { message: String },
}

impl Finalization {
    fn finish_reason(&self) -> FinishReason {
        match self {
            Self::Cancelled => FinishReason::Cancelled,
            Self::Failed { .. } => FinishReason::Error,
        }
    }

    fn settle(&self, tool_call: &ToolCall, now: OffsetDateTime) -> ToolCall {
        match self {
            Self::Cancelled => {
                let result = tool_call
                    .result
                    .clone()
                    .unwrap_or_else(|| CANCELLED_TOOL_RESULT.to_owned());
                tool_call.completed(result, now)
            }
            Self::Failed { message } => {
                let result = tool_call
                    .result
                    .clone()
                    .unwrap_or_else(|| format!("error: {message}"));
                tool_call.failed(result, now)
            }
        }
    }
}

pub fn apply_event(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    event: &StreamEvent,
    now: OffsetDateTime,
) -> Applied {
    match event {
        StreamEvent::MessageChunk(chunk) => apply_message_chunk(transcript, chunk, now),
        StreamEvent::ToolCalls(batch) => apply_tool_calls(transcript, registry, batch, now),
        StreamEvent::ToolCallResult(result) => {
            apply_tool_call_result(transcript, registry, result, now)
        }
        StreamEvent::FinalReport(report) => apply_final_report(transcript, report, now),
        StreamEvent::Cancelled => apply_cancelled(transcript, registry, now),
        StreamEvent::Error(error) => apply_error(transcript, registry, &error.message_text(), now),
        StreamEvent::Unknown { name } => {
            debug!(event = %name, "ignoring unknown stream event");
            Applied::Unchanged
        }
    }
}

pub fn apply_message_chunk(
    transcript: &mut Transcript,
    chunk: &MessageChunkEvent,
    now: OffsetDateTime,
) -> Applied {
    let agent = event_agent(chunk.agent.as_deref());
    let thread_id = chunk.thread_id.as_deref().unwrap_or_default();
    let text = chunk.content.as_deref().unwrap_or_default();
    let raw_finish = chunk
        .finish_reason
        .as_deref()
        .filter(|reason| !reason.trim().is_empty());
    let finish_reason = raw_finish.and_then(FinishReason::parse);
    let stop = finish_reason == Some(FinishReason::Stop);

    let (index, mut next) = match transcript.find_open(thread_id, agent) {
        Some(index) => match transcript.get(index) {
            Some(current) => (Some(index), current.clone()),
            None => return Applied::Unchanged,
        },
        None if !text.is_empty() || raw_finish.is_none() => (
            None,
            Message::open_assistant(thread_id, agent, chunk.id.clone(), now),
        ),
        None => {
            debug!(thread_id, agent, "finish-only chunk without an open message");
            return Applied::Unchanged;
        }
    };

    next.append_text(text);
    next.streaming = !stop;
    next.completed = stop;
    next.finish_reason = finish_reason;
    if chunk.id.is_some() {
        next.last_run_id = chunk.id.clone();
    }
    next.updated_at = now;

    match index {
        Some(index) => {
            transcript.replace(index, next);
        }
        None => {
            transcript.push(next);
        }
    }
    Applied::Changed
}

pub fn apply_tool_calls(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    batch: &ToolCallsEvent,
    now: OffsetDateTime,
) -> Applied {
    let Some(calls) = batch.tool_calls.as_deref() else {
        debug!("tool_calls event without a call list");
        return Applied::Unchanged;
    };

    let sequence = registry.begin_batch();
    if calls.is_empty() {
        return Applied::Unchanged;
    }

    let batch_id = match batch.id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => id.to_owned(),
        None => format!("{TOOL_BATCH_FALLBACK_ID}-{sequence}"),
    };
    let issued: Vec<ToolCall> = calls
        .iter()
        .enumerate()
        .map(|(index, call)| {
            let key = call
                .call_id()
                .map(ToOwned::to_owned)
                .unwrap_or_else(|| format!("{batch_id}-{index}"));
            let args = tool_arguments_or_empty(&key, call.raw_arguments());
            let tool_call = ToolCall::executing(
                key,
                call.call_id().map(ToOwned::to_owned),
                index,
                call.tool_name().unwrap_or(UNKNOWN_TOOL_NAME),
                args,
                now,
            );
            registry.upsert(tool_call.clone());
            tool_call
        })
        .collect();

    let agent = event_agent(batch.agent.as_deref());
    let thread_id = batch.thread_id.as_deref().unwrap_or_default();
    let open = transcript.find_open(thread_id, agent);
    let mut next = match open.and_then(|index| transcript.get(index)) {
        Some(current) => current.clone(),
        None => Message::open_assistant(thread_id, agent, batch.id.clone(), now),
    };

    next.content_items
        .extend(issued.into_iter().map(ContentItem::tool_call));
    next.refresh_tool_calls();
    if batch.id.is_some() {
        next.last_run_id = batch.id.clone();
    }
    next.updated_at = now;

    debug!(thread_id, agent, calls = registry.len(), "tool calls issued");
    match open {
        Some(index) => {
            transcript.replace(index, next);
        }
        None => {
            transcript.push(next);
        }
    }
    Applied::Changed
}

pub fn apply_tool_call_result(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    result: &ToolCallResultEvent,
    now: OffsetDateTime,
) -> Applied {
    let Some(result_id) = result.tool_call_id.as_deref() else {
        debug!("tool result without a tool_call_id");
        return Applied::Unchanged;
    };
    let Some(key) = registry.resolve(result_id).map(ToOwned::to_owned) else {
        debug!(result_id, "tool result for an unknown tool call");
        return Applied::Unchanged;
    };
    let Some(current) = registry.get(&key) else {
        return Applied::Unchanged;
    };
    if current.status.is_terminal() {
        debug!(result_id, key = %key, "tool call already settled");
        return Applied::Unchanged;
    }

    let content = result
        .content
        .as_ref()
        .map(value_to_text)
        .unwrap_or_default();
    let mut updated = current.completed(content, now);
    if let Some(tool_name) = result.tool_name.as_deref().filter(|name| !name.is_empty()) {
        updated.tool_name = Some(tool_name.to_owned());
    }

    registry.upsert(updated.clone());
    propagate_tool_call(transcript, &updated, now);
    Applied::Changed
}

pub fn apply_final_report(
    transcript: &mut Transcript,
    report: &FinalReportEvent,
    now: OffsetDateTime,
) -> Applied {
    let text = report.report.clone().unwrap_or_default();
    let content_items = if text.is_empty() {
        Vec::new()
    } else {
        vec![ContentItem::text(text)]
    };

    transcript.push(Message {
        id: new_message_id("report"),
        role: Role::Assistant,
        agent: None,
        thread_id: None,
        content_items,
        streaming: false,
        completed: true,
        finish_reason: Some(FinishReason::Stop),
        tool_calls: Vec::new(),
        is_report: true,
        last_run_id: None,
        created_at: now,
        updated_at: now,
    });
    Applied::Changed
}

/// Server-side cancellation of the message that is still streaming.
pub fn apply_cancelled(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    now: OffsetDateTime,
) -> Applied {
    match transcript.last_streaming() {
        Some(index) => finalize(transcript, registry, index, &Finalization::Cancelled, now),
        None => Applied::Unchanged,
    }
}

/// Error finalization; the message is also recorded as the transcript error.
pub fn apply_error(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    message: &str,
    now: OffsetDateTime,
) -> Applied {
    transcript.set_error(message);
    match transcript.last_open() {
        Some(index) => finalize(
            transcript,
            registry,
            index,
            &Finalization::Failed {
                message: message.to_owned(),
            },
            now,
        ),
        None => Applied::Unchanged,
    }
}

/// Caller-initiated disconnect: closes whatever is still open as cancelled.
pub fn abort_open(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    now: OffsetDateTime,
) -> Applied {
    match transcript.last_open() {
        Some(index) => finalize(transcript, registry, index, &Finalization::Cancelled, now),
        None => Applied::Unchanged,
    }
}

fn finalize(
    transcript: &mut Transcript,
    registry: &mut ToolCallRegistry,
    index: usize,
    how: &Finalization,
    now: OffsetDateTime,
) -> Applied {
    let Some(current) = transcript.get(index) else {
        return Applied::Unchanged;
    };

    let mut next = current.clone();
    next.content_items = next
        .content_items
        .into_iter()
        .map(|item| match item {
            ContentItem::ToolCall { tool_call } if tool_call.is_executing() => {
                ContentItem::tool_call(how.settle(&tool_call, now))
            }
            other => other,
        })
        .collect();
    next.refresh_tool_calls();
    next.streaming = false;
    next.completed = true;
    next.finish_reason = Some(how.finish_reason());
    next.updated_at = now;

    for tool_call in &next.tool_calls {
        if registry.contains_key(&tool_call.id) {
            registry.upsert(tool_call.clone());
        }
    }

    debug!(
        message_id = %next.id,
        finish_reason = how.finish_reason().as_str(),
        "message finalized"
    );
    transcript.replace(index, next);
    Applied::Changed
}

/// Copies a settled tool call into the messages still waiting on it. Items
/// that already settled, including those of earlier turns reusing the same
/// key, keep their result.
fn propagate_tool_call(transcript: &mut Transcript, updated: &ToolCall, now: OffsetDateTime) {
    let targets: Vec<usize> = transcript
        .messages()
        .iter()
        .enumerate()
        .filter(|(_, message)| message.awaits_tool_call(&updated.id))
        .map(|(index, _)| index)
        .collect();

    for index in targets {
        let Some(current) = transcript.get(index) else {
            continue;
        };
        let mut next = current.clone();
        next.content_items = next
            .content_items
            .into_iter()
            .map(|item| match item {
                ContentItem::ToolCall { tool_call }
                    if tool_call.id == updated.id && tool_call.is_executing() =>
                {
                    ContentItem::tool_call(updated.clone())
                }
                other => other,
            })
            .collect();
        next.refresh_tool_calls();
        next.updated_at = now;
        transcript.replace(index, next);
    }
}

fn event_agent(agent: Option<&str>) -> &str {
    agent
        .filter(|agent| !agent.trim().is_empty())
        .unwrap_or(DEFAULT_AGENT)
}
