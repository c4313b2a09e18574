use chat_protocol::{Checkpoint, HistoryResponse};
use pretty_assertions::assert_eq;
use serde_json::json;
use time::macros::datetime;
use time::OffsetDateTime;
use transcript::{assemble, ItemView, Role, ToolCallStatus, Transcript};

fn checkpoints(value: serde_json::Value) -> Vec<Checkpoint> {
    serde_json::from_value(value).expect("checkpoints should deserialize")
}

fn sample() -> Vec<Checkpoint> {
    checkpoints(json!([
        {
            "checkpoint_id": "cp-1",
            "created_at": "2025-03-01T10:00:00Z",
            "messages": [
                {"role": "human", "content": "What is the answer?"},
                {
                    "role": "ai",
                    "content": "Let me look it up.",
                    "additional_kwargs": {
                        "tool_calls": [
                            {"id": "call_1", "function": {"name": "lookup", "arguments": "{\"q\":\"answer\"}"}}
                        ]
                    }
                },
                {"role": "tool", "tool_call_id": "call_1", "content": "42"}
            ]
        },
        {
            "checkpoint_id": "cp-2",
            "created_at": "2025-03-01T10:01:00Z",
            "messages": [
                {"role": "human", "content": "What is the answer?"},
                {"role": "ai", "content": [{"type": "text", "text": "It is 42."}]}
            ]
        }
    ]))
}

#[test]
fn assembles_messages_and_attaches_tool_results() {
    let messages = assemble(&sample(), OffsetDateTime::UNIX_EPOCH);

    let roles: Vec<Role> = messages.iter().map(|message| message.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Assistant]);
    assert!(messages.iter().all(|message| message.completed && !message.streaming));

    let items = messages[1].content_view().items;
    assert_eq!(
        items,
        vec![
            ItemView::Text("Let me look it up.".to_owned()),
            ItemView::ToolCall {
                id: "call_1".to_owned(),
                name: "lookup".to_owned(),
                args: json!({"q": "answer"}),
                status: ToolCallStatus::Completed,
                result: Some("42".to_owned()),
            },
        ]
    );
    assert_eq!(messages[1].tool_calls.len(), 1);
    assert_eq!(messages[2].text(), "It is 42.");
    assert_eq!(messages[0].created_at, datetime!(2025-03-01 10:00:00 UTC));
}

#[test]
fn repeated_role_and_content_yield_one_message() {
    let messages = assemble(&sample(), OffsetDateTime::UNIX_EPOCH);
    let questions = messages
        .iter()
        .filter(|message| message.role == Role::User && message.text() == "What is the answer?")
        .count();
    assert_eq!(questions, 1);
}

#[test]
fn assembling_twice_is_content_equal() {
    let checkpoints = sample();
    let first = Transcript::from_messages(assemble(&checkpoints, OffsetDateTime::UNIX_EPOCH));
    let second = Transcript::from_messages(assemble(&checkpoints, OffsetDateTime::now_utc()));

    assert_eq!(first.content_view(), second.content_view());
    assert_ne!(first.messages()[0].id, second.messages()[0].id);
}

#[test]
fn unanswered_tool_calls_stay_executing_and_unknown_roles_are_skipped() {
    let checkpoints = checkpoints(json!([{
        "checkpoint_id": "cp-9",
        "messages": [
            {"role": "system", "content": "be nice"},
            {
                "type": "ai",
                "content": "",
                "additional_kwargs": {"tool_calls": [{"name": "search", "args": "not json"}]}
            }
        ]
    }]));
    let fallback = datetime!(2025-01-01 00:00:00 UTC);
    let messages = assemble(&checkpoints, fallback);

    assert_eq!(messages.len(), 1);
    let call = messages[0].tool_calls.first().expect("synthesized tool call");
    assert_eq!(call.id, "cp-9-1-0");
    assert_eq!(call.status, ToolCallStatus::Executing);
    assert_eq!(call.args, json!({}));
    assert_eq!(messages[0].created_at, fallback);
}

#[test]
fn history_response_payload_feeds_the_assembler() {
    let response: HistoryResponse = serde_json::from_value(json!({
        "thread_id": "t1",
        "total": 1,
        "page": 1,
        "page_size": 10,
        "total_pages": 1,
        "messages": [
            {"checkpoint_id": "cp-1", "messages": [{"role": "user", "content": "hi"}]}
        ]
    }))
    .expect("history response");

    let messages = assemble(&response.messages, OffsetDateTime::UNIX_EPOCH);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text(), "hi");
}

#[test]
fn tool_only_assistant_messages_are_kept_apart_by_call_ids() {
    let checkpoints = checkpoints(json!([{
        "checkpoint_id": "cp-3",
        "messages": [
            {"role": "ai", "content": "", "additional_kwargs": {"tool_calls": [{"id": "call_a", "name": "search"}]}},
            {"role": "tool", "tool_call_id": "call_a", "content": "a"},
            {"role": "ai", "content": "", "additional_kwargs": {"tool_calls": [{"id": "call_b", "name": "fetch"}]}},
            {"role": "tool", "tool_call_id": "call_b", "content": "b"},
            {"role": "ai", "content": "", "additional_kwargs": {"tool_calls": [{"id": "call_b", "name": "fetch"}]}}
        ]
    }]));
    let messages = assemble(&checkpoints, OffsetDateTime::UNIX_EPOCH);

    let results: Vec<Option<String>> = messages
        .iter()
        .map(|message| message.tool_calls[0].result.clone())
        .collect();
    assert_eq!(results, vec![Some("a".to_owned()), Some("b".to_owned())]);
}
