use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{atomic::AtomicBool, atomic::Ordering, Arc};
use std::time::Duration;

use chat_protocol::{
    ConfigsResponse, HistoryRequest, HistoryResponse, ThreadsRequest, ThreadsResponse,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::error::{parse_error_message, ApiError};
use crate::headers::{build_headers, to_header_map, RequestKind};
use crate::url::resolve_api_url;

/// Cancellation flag shared between a caller and an in-flight request.
pub type CancelSignal = Arc<AtomicBool>;

pub const CHAT_STREAM_PATH: &str = "chat/stream";
pub const CHAT_HISTORY_PATH: &str = "chat/history";
pub const CHAT_THREADS_PATH: &str = "chat/threads";
pub const CONFIGS_PATH: &str = "configs";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// HTTP client for the KaFlow chat endpoints.
///
/// Every operation is a single attempt: failures are returned to the caller,
/// which decides whether to try again.
#[derive(Debug)]
pub struct ChatApiClient {
    http: Client,
    config: ApiConfig,
}

impl ChatApiClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        // Fail fast on an unusable base URL instead of on the first request.
        resolve_api_url(&config.base_url, CHAT_STREAM_PATH)?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn endpoint(&self, path: &str) -> Result<String, ApiError> {
        resolve_api_url(&self.config.base_url, path)
    }

    /// Issue the streaming POST and return the response once headers arrive.
    ///
    /// Non-success statuses are read and reported as [`ApiError::Status`].
    pub async fn send_stream_request(&self, url: &str, body: &Value) -> Result<Response, ApiError> {
        let headers = to_header_map(&build_headers(&self.config, RequestKind::EventStream))?;
        let response = self.http.post(url).headers(headers).json(body).send().await?;
        ensure_success(response).await
    }

    pub async fn fetch_history(
        &self,
        request: &HistoryRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<HistoryResponse, ApiError> {
        let response: HistoryResponse = self
            .post_json(CHAT_HISTORY_PATH, request, cancellation)
            .await?;
        if let Some(error) = response.error.as_deref().filter(|error| !error.is_empty()) {
            warn!(thread_id = %request.thread_id, %error, "history endpoint reported an error");
        }
        Ok(response)
    }

    pub async fn fetch_threads(
        &self,
        request: &ThreadsRequest,
        cancellation: Option<&CancelSignal>,
    ) -> Result<ThreadsResponse, ApiError> {
        self.post_json(CHAT_THREADS_PATH, request, cancellation).await
    }

    pub async fn fetch_configs(
        &self,
        cancellation: Option<&CancelSignal>,
    ) -> Result<ConfigsResponse, ApiError> {
        let url = self.endpoint(CONFIGS_PATH)?;
        let headers = to_header_map(&build_headers(&self.config, RequestKind::Json))?;
        let mut request = self.http.get(&url).headers(headers);
        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }

        let response = await_or_cancel(request.send(), cancellation).await??;
        let response = await_or_cancel(ensure_success(response), cancellation).await??;
        let configs: ConfigsResponse = await_or_cancel(response.json(), cancellation).await??;
        debug!(count = configs.configs.len(), "fetched configs");
        Ok(configs)
    }

    /// Map of config id to display name; empty when the fetch fails.
    pub async fn config_name_map(&self) -> BTreeMap<String, String> {
        match self.fetch_configs(None).await {
            Ok(response) => response
                .configs
                .into_iter()
                .map(|config| (config.id, config.name))
                .collect(),
            Err(error) => {
                warn!(%error, "failed to fetch config names");
                BTreeMap::new()
            }
        }
    }

    async fn post_json<B, R>(
        &self,
        path: &str,
        body: &B,
        cancellation: Option<&CancelSignal>,
    ) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let headers = to_header_map(&build_headers(&self.config, RequestKind::Json))?;
        let mut request = self.http.post(&url).headers(headers).json(body);
        if let Some(timeout) = self.config.request_timeout {
            request = request.timeout(timeout);
        }

        let response = await_or_cancel(request.send(), cancellation).await??;
        let response = await_or_cancel(ensure_success(response), cancellation).await??;
        let parsed = await_or_cancel(response.json::<R>(), cancellation).await??;
        debug!(%url, "request completed");
        Ok(parsed)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_else(|_| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(ApiError::Status {
        status,
        message: parse_error_message(status, &body),
    })
}

pub(crate) fn is_cancelled(cancel: Option<&CancelSignal>) -> bool {
    cancel.is_some_and(|token| token.load(Ordering::Acquire))
}

pub(crate) async fn await_or_cancel<F>(
    future: F,
    cancellation: Option<&CancelSignal>,
) -> Result<F::Output, ApiError>
where
    F: Future,
{
    if cancellation.is_none() {
        return Ok(future.await);
    }

    let mut future = Box::pin(future);

    loop {
        if is_cancelled(cancellation) {
            return Err(ApiError::Cancelled);
        }

        if let Ok(output) = tokio::time::timeout(CANCEL_POLL_INTERVAL, &mut future).await {
            if is_cancelled(cancellation) {
                return Err(ApiError::Cancelled);
            }
            return Ok(output);
        }
    }
}
