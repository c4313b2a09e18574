//! Environment configuration.

use std::env;
use std::time::Duration;

use kaflow_api::{ApiConfig, DEFAULT_BASE_URL};
use tracing::warn;

pub const ENV_BASE_URL: &str = "KAFLOW_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "KAFLOW_TIMEOUT_MS";
pub const ENV_CONFIG_ID: &str = "KAFLOW_CONFIG_ID";
pub const ENV_USERNAME: &str = "KAFLOW_USERNAME";
pub const ENV_LOG: &str = "KAFLOW_LOG";

pub const DEFAULT_CONFIG_ID: i64 = 1;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub config_id: i64,
    pub username: Option<String>,
    pub log_filter: String,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: env_string_opt(ENV_BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            timeout: env_parsed::<u64>(ENV_TIMEOUT_MS)
                .filter(|millis| *millis > 0)
                .map(Duration::from_millis),
            config_id: env_parsed(ENV_CONFIG_ID).unwrap_or(DEFAULT_CONFIG_ID),
            username: env_string_opt(ENV_USERNAME),
            log_filter: env_string_opt(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned()),
        }
    }

    /// Client configuration; the timeout bounds both connecting and
    /// non-streaming requests.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        let config = ApiConfig::new(&self.base_url);
        match self.timeout {
            Some(timeout) => config
                .with_connect_timeout(timeout)
                .with_request_timeout(timeout),
            None => config,
        }
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value.trim().to_owned())
        }
    })
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env_string_opt(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment value");
            None
        }
    }
}
