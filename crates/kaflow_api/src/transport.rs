//! Cancelable SSE stream transport.
//!
//! A spawned reader task owns the HTTP response, feeds body chunks to
//! [`SseStreamParser`] and forwards complete events over a bounded channel.
//! Aborting the task drops the response, which closes the connection.

use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::client::{is_cancelled, CancelSignal, ChatApiClient};
use crate::error::ApiError;
use crate::sse::{SseEvent, SseStreamParser};

pub type StreamItem = Result<SseEvent, ApiError>;

/// Clonable handle that aborts one open stream from any task.
#[derive(Debug, Clone)]
pub struct StreamAbortHandle {
    cancel: CancelSignal,
    task: tokio::task::AbortHandle,
}

impl StreamAbortHandle {
    /// Marks the stream cancelled and tears down its reader task.
    pub fn abort(&self) {
        self.cancel.store(true, Ordering::Release);
        self.task.abort();
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        is_cancelled(Some(&self.cancel))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Lazy sequence of parsed SSE events from one open stream.
///
/// Ends with `None` after the server closes the stream or after an abort; a
/// network or protocol failure is delivered as a single `Err` item first.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<StreamItem>,
    abort: StreamAbortHandle,
}

impl EventStream {
    /// True when the stream ended because a caller aborted it.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    #[must_use]
    pub fn abort_handle(&self) -> StreamAbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }
}

impl Stream for EventStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.abort.is_aborted() {
            return Poll::Ready(None);
        }
        self.receiver.poll_recv(cx)
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        // Nobody is left to read; stop the reader so the connection closes now.
        self.abort.task.abort();
    }
}

/// Single-stream transport: opening a new stream aborts the previous one.
#[derive(Debug)]
pub struct StreamTransport {
    client: Arc<ChatApiClient>,
    active: Option<StreamAbortHandle>,
}

impl StreamTransport {
    pub fn new(client: Arc<ChatApiClient>) -> Self {
        Self {
            client,
            active: None,
        }
    }

    pub fn client(&self) -> &Arc<ChatApiClient> {
        &self.client
    }

    /// Open `path` with a JSON body and start reading events.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open<P>(&mut self, path: &str, payload: &P) -> Result<EventStream, ApiError>
    where
        P: Serialize + ?Sized,
    {
        if self.abort() {
            debug!("previous stream aborted by new open");
        }

        let url = self.client.endpoint(path)?;
        let body = serde_json::to_value(payload)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|error| ApiError::NoRuntime(error.to_string()))?;

        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = mpsc::channel(self.client.config().stream_buffer.max(1));
        let task = runtime.spawn(pump_events(
            Arc::clone(&self.client),
            url,
            body,
            Arc::clone(&cancel),
            sender,
        ));

        let abort = StreamAbortHandle {
            cancel,
            task: task.abort_handle(),
        };
        self.active = Some(abort.clone());
        Ok(EventStream { receiver, abort })
    }

    /// Abort the open stream, if any. Returns whether one was still running.
    pub fn abort(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                let running = !handle.is_finished() && !handle.is_aborted();
                handle.abort();
                running
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.is_finished() && !handle.is_aborted())
    }

    #[must_use]
    pub fn abort_handle(&self) -> Option<StreamAbortHandle> {
        self.active.clone()
    }
}

async fn pump_events(
    client: Arc<ChatApiClient>,
    url: String,
    body: Value,
    cancel: CancelSignal,
    sender: mpsc::Sender<StreamItem>,
) {
    match read_events(&client, &url, &body, &cancel, &sender).await {
        Ok(forwarded) => debug!(%url, forwarded, "event stream ended"),
        Err(error) if is_cancelled(Some(&cancel)) => {
            debug!(%url, %error, "event stream aborted");
        }
        Err(error) => {
            warn!(%url, %error, "event stream failed");
            let _ = sender.send(Err(error)).await;
        }
    }
}

async fn read_events(
    client: &ChatApiClient,
    url: &str,
    body: &Value,
    cancel: &CancelSignal,
    sender: &mpsc::Sender<StreamItem>,
) -> Result<usize, ApiError> {
    let response = client.send_stream_request(url, body).await?;
    let mut bytes = response.bytes_stream();
    let mut parser = SseStreamParser::default();
    let mut forwarded = 0usize;

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk?;
        for event in parser.feed(&chunk) {
            if !forward(event, cancel, sender).await {
                return Ok(forwarded);
            }
            forwarded += 1;
        }
    }

    if let Some(event) = parser.finish() {
        if forward(event, cancel, sender).await {
            forwarded += 1;
        }
    }

    Ok(forwarded)
}

async fn forward(event: SseEvent, cancel: &CancelSignal, sender: &mpsc::Sender<StreamItem>) -> bool {
    if is_cancelled(Some(cancel)) {
        return false;
    }
    sender.send(Ok(event)).await.is_ok()
}
