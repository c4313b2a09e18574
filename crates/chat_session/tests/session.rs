use std::sync::Arc;

use chat_session::{ChatSession, SessionError, SessionUpdate};
use kaflow_api::{ApiConfig, ApiError, ChatApiClient};
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Duration};
use transcript::{FinishReason, Role, ToolCallStatus, CANCELLED_TOOL_RESULT};

fn allow_local_integration() -> bool {
    std::env::var("KAFLOW_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn offline_client() -> Arc<ChatApiClient> {
    Arc::new(ChatApiClient::new(ApiConfig::new("http://127.0.0.1:9")).expect("client"))
}

/// Serves one scripted response per connection, in order.
struct ScriptedServer {
    base_url: String,
    handle: JoinHandle<()>,
}

struct Script {
    status: u16,
    content_type: &'static str,
    chunks: Vec<(u64, String)>,
}

impl ScriptedServer {
    async fn new(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let base_url = format!("http://{}", listener.local_addr().expect("listener address"));

        let handle = tokio::spawn(async move {
            for script in scripts {
                let Ok((socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(serve_one(socket, script));
            }
        });

        Self { base_url, handle }
    }

    fn client(&self) -> Arc<ChatApiClient> {
        Arc::new(ChatApiClient::new(ApiConfig::new(&self.base_url)).expect("client"))
    }
}

impl Drop for ScriptedServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn sse(frames: &[(&str, &str)]) -> String {
    frames
        .iter()
        .map(|(event, data)| format!("event: {event}\ndata: {data}\n\n"))
        .collect()
}

async fn serve_one(mut socket: TcpStream, script: Script) {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];
    while !request.windows(4).any(|window| window == b"\r\n\r\n") {
        match socket.read(&mut buffer).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buffer[..n]),
        }
    }

    let head = format!(
        "HTTP/1.1 {} OK\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        script.status, script.content_type
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }
    for (delay_ms, body) in script.chunks {
        if delay_ms > 0 {
            sleep(Duration::from_millis(delay_ms)).await;
        }
        let frame = format!("{:X}\r\n{body}\r\n", body.len());
        if socket.write_all(frame.as_bytes()).await.is_err() {
            return;
        }
    }
    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

#[tokio::test]
async fn send_rejects_blank_messages() {
    let mut session = ChatSession::new(offline_client(), 1);
    let error = session.send("   ").expect_err("blank text");
    assert!(matches!(error, SessionError::EmptyMessage));
    assert!(session.messages().is_empty());
    assert!(matches!(session.next_update().await, SessionUpdate::Idle));
}

#[tokio::test]
async fn send_stores_text_as_typed() {
    let mut session = ChatSession::new(offline_client(), 1);
    session.send("  indented\n").expect("turn starts");
    assert!(session.is_streaming());
    assert!(session.disconnect());

    let messages = session.messages();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].text(), "  indented\n");
}

#[tokio::test]
async fn new_thread_resets_transcript_and_rotates_id() {
    let mut session = ChatSession::new(offline_client(), 1).with_username("ada");
    session.add_user_message("hello");
    let before = session.thread_id().to_owned();

    let after = session.new_thread().to_owned();

    assert_ne!(before, after);
    assert!(after.starts_with("ada_"));
    assert!(session.messages().is_empty());
    assert!(!session.disconnect());
}

#[tokio::test]
async fn streamed_turn_builds_user_and_assistant_messages() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![Script {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![(
            0,
            sse(&[
                ("message_chunk", r#"{"id":"r1","agent":"a","thread_id":"t1","content":"Hel"}"#),
                ("tool_calls", r#"{"id":"r1","agent":"a","thread_id":"t1","tool_calls":[{"id":"call_1","name":"lookup","args":{}}]}"#),
                ("tool_call_result", r#"{"tool_call_id":"call_1","content":"42"}"#),
                ("message_chunk", r#"{"id":"r1","agent":"a","thread_id":"t1","content":"lo","finish_reason":"stop"}"#),
            ]),
        )],
    }])
    .await;

    let mut session = ChatSession::new(server.client(), 7).with_thread_id("t1");
    session.send("hi").expect("turn starts");
    timeout(Duration::from_secs(5), session.run_to_end())
        .await
        .expect("turn finishes")
        .expect("no transport failure");

    let messages = session.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].text(), "Hello");
    assert_eq!(messages[1].finish_reason, Some(FinishReason::Stop));
    assert_eq!(messages[1].tool_calls[0].result.as_deref(), Some("42"));
    assert!(!session.is_streaming());
}

#[tokio::test]
async fn abort_from_another_task_cancels_open_work() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![Script {
        status: 200,
        content_type: "text/event-stream",
        chunks: vec![
            (
                0,
                sse(&[(
                    "tool_calls",
                    r#"{"id":"r1","agent":"a","thread_id":"t1","tool_calls":[{"id":"call_1","name":"lookup"}]}"#,
                )]),
            ),
            (5_000, sse(&[("message_chunk", r#"{"agent":"a","thread_id":"t1","content":"late"}"#)])),
        ],
    }])
    .await;

    let mut session = ChatSession::new(server.client(), 1).with_thread_id("t1");
    session.send("hi").expect("turn starts");
    let first = timeout(Duration::from_secs(5), session.next_update())
        .await
        .expect("first event");
    assert!(matches!(first, SessionUpdate::Applied { changed: true, .. }));

    let handle = session.abort_handle().expect("stream open");
    tokio::spawn(async move { handle.abort() })
        .await
        .expect("abort task");

    let update = timeout(Duration::from_secs(5), session.next_update())
        .await
        .expect("update after abort");
    assert!(matches!(update, SessionUpdate::Cancelled));

    let message = &session.messages()[1];
    assert_eq!(message.finish_reason, Some(FinishReason::Cancelled));
    assert_eq!(message.tool_calls[0].status, ToolCallStatus::Completed);
    assert_eq!(message.tool_calls[0].result.as_deref(), Some(CANCELLED_TOOL_RESULT));
    assert!(session.messages().iter().all(|message| message.text() != "late"));
}

#[tokio::test]
async fn transport_failure_finalizes_as_error_and_keeps_transcript() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(vec![Script {
        status: 503,
        content_type: "application/json",
        chunks: vec![(0, r#"{"error":"graph unavailable"}"#.to_owned())],
    }])
    .await;

    let mut session = ChatSession::new(server.client(), 1);
    session.send("hi").expect("turn starts");
    let error = timeout(Duration::from_secs(5), session.run_to_end())
        .await
        .expect("turn ends")
        .expect_err("transport failure surfaces");

    assert!(matches!(
        error.api_error(),
        Some(ApiError::Status { message, .. }) if message == "graph unavailable"
    ));
    assert_eq!(session.messages().len(), 1);
    assert!(session
        .error()
        .is_some_and(|error| error.contains("graph unavailable")));
}

#[tokio::test]
async fn load_history_seeds_the_transcript() {
    if !allow_local_integration() {
        return;
    }

    let page = r#"{
        "thread_id": "t1", "total": 1, "page": 1, "page_size": 10, "total_pages": 1,
        "messages": [{
            "checkpoint_id": "cp-1",
            "created_at": "2025-03-01T10:00:00Z",
            "messages": [
                {"role": "human", "content": "hi"},
                {"role": "ai", "content": "hello"}
            ]
        }]
    }"#;
    let server = ScriptedServer::new(vec![Script {
        status: 200,
        content_type: "application/json",
        chunks: vec![(0, page.to_owned())],
    }])
    .await;

    let mut session = ChatSession::new(server.client(), 1).with_thread_id("t1");
    let loaded = timeout(Duration::from_secs(5), session.load_history(10, None))
        .await
        .expect("history loads")
        .expect("history request succeeds");

    assert_eq!(loaded, 2);
    let texts: Vec<String> = session.messages().iter().map(|message| message.text()).collect();
    assert_eq!(texts, vec!["hi".to_owned(), "hello".to_owned()]);
}
