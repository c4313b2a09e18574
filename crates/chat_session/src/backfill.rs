use std::collections::HashSet;

use chat_protocol::{Checkpoint, HistoryRequest, HistoryResponse, SortOrder};
use kaflow_api::{ApiError, CancelSignal, ChatApiClient};
use time::OffsetDateTime;
use tracing::debug;
use transcript::{assemble, Message};

/// Pages backwards through a thread's history, newest page first.
///
/// Checkpoints accumulate in chronological order and every page re-assembles
/// the whole set, so duplicates that straddle a page boundary collapse.
#[derive(Debug, Clone)]
pub struct HistoryBackfill {
    thread_id: String,
    page_size: u32,
    next_page: u32,
    exhausted: bool,
    checkpoints: Vec<Checkpoint>,
    seen: HashSet<String>,
}

impl HistoryBackfill {
    #[must_use]
    pub fn new(thread_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            thread_id: thread_id.into(),
            page_size: page_size.max(1),
            next_page: 1,
            exhausted: false,
            checkpoints: Vec::new(),
            seen: HashSet::new(),
        }
    }

    #[must_use]
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        !self.exhausted
    }

    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// The request for the next older page.
    #[must_use]
    pub fn next_request(&self) -> HistoryRequest {
        HistoryRequest::new(self.thread_id.clone())
            .with_page(self.next_page)
            .with_page_size(self.page_size)
            .with_order(SortOrder::Desc)
    }

    /// Fold one newest-first page in front of what is already loaded.
    /// Returns how many new checkpoints were added.
    pub fn absorb(&mut self, response: HistoryResponse) -> usize {
        let page_len = response.messages.len();
        let mut older: Vec<Checkpoint> = response
            .messages
            .into_iter()
            .rev()
            .filter(|checkpoint| {
                checkpoint.checkpoint_id.is_empty()
                    || self.seen.insert(checkpoint.checkpoint_id.clone())
            })
            .collect();
        let added = older.len();

        older.append(&mut self.checkpoints);
        self.checkpoints = older;

        let last_page = response.total_pages == 0 || self.next_page >= response.total_pages;
        self.exhausted = page_len == 0 || last_page;
        self.next_page = self.next_page.saturating_add(1);

        debug!(
            thread_id = %self.thread_id,
            added,
            loaded = self.checkpoints.len(),
            more = !self.exhausted,
            "history page absorbed"
        );
        added
    }

    #[must_use]
    pub fn assemble(&self, now: OffsetDateTime) -> Vec<Message> {
        assemble(&self.checkpoints, now)
    }

    /// Fetch the next older page and return the re-assembled transcript.
    pub async fn load_next_page(
        &mut self,
        client: &ChatApiClient,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Vec<Message>, ApiError> {
        if self.has_more() {
            let response = client.fetch_history(&self.next_request(), cancellation).await?;
            self.absorb(response);
        }
        Ok(self.assemble(OffsetDateTime::now_utc()))
    }

    pub async fn load_all(
        &mut self,
        client: &ChatApiClient,
        cancellation: Option<&CancelSignal>,
    ) -> Result<Vec<Message>, ApiError> {
        while self.has_more() {
            let response = client.fetch_history(&self.next_request(), cancellation).await?;
            self.absorb(response);
        }
        Ok(self.assemble(OffsetDateTime::now_utc()))
    }
}

#[cfg(test)]
mod tests {
    use chat_protocol::{Checkpoint, HistoryMessage, HistoryResponse, SortOrder};
    use time::OffsetDateTime;

    use super::HistoryBackfill;

    fn page(page: u32, total_pages: u32, ids: &[&str]) -> HistoryResponse {
        HistoryResponse {
            thread_id: "t1".to_owned(),
            page,
            page_size: 2,
            total_pages,
            messages: ids
                .iter()
                .map(|id| Checkpoint {
                    checkpoint_id: (*id).to_owned(),
                    messages: vec![HistoryMessage {
                        role: "human".to_owned(),
                        content: serde_json::Value::String(format!("message {id}")),
                        ..HistoryMessage::default()
                    }],
                    ..Checkpoint::default()
                })
                .collect(),
            ..HistoryResponse::default()
        }
    }

    #[test]
    fn pages_are_prepended_in_chronological_order() {
        let mut backfill = HistoryBackfill::new("t1", 2);
        assert_eq!(backfill.next_request().order, SortOrder::Desc);

        backfill.absorb(page(1, 2, &["c4", "c3"]));
        assert!(backfill.has_more());
        assert_eq!(backfill.next_request().page, 2);

        backfill.absorb(page(2, 2, &["c3", "c2", "c1"]));
        assert!(!backfill.has_more());

        let ids: Vec<&str> = backfill
            .checkpoints()
            .iter()
            .map(|checkpoint| checkpoint.checkpoint_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);

        let texts: Vec<String> = backfill
            .assemble(OffsetDateTime::UNIX_EPOCH)
            .iter()
            .map(|message| message.text())
            .collect();
        assert_eq!(texts, vec!["message c1", "message c2", "message c3", "message c4"]);
    }

    #[test]
    fn empty_page_ends_the_backfill() {
        let mut backfill = HistoryBackfill::new("t1", 10);
        assert_eq!(backfill.absorb(page(1, 5, &[])), 0);
        assert!(!backfill.has_more());
    }
}
