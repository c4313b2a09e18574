use serde::{Deserialize, Serialize};

use crate::history::{SortOrder, DEFAULT_PAGE_SIZE};

/// Body of `POST chat/threads`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub order: SortOrder,
}

impl Default for ThreadsRequest {
    fn default() -> Self {
        Self {
            username: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            order: SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub thread_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_message: String,
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub config_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadsResponse {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub threads: Vec<Thread>,
}
