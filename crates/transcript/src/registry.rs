use std::collections::HashMap;

use crate::model::ToolCall;

/// Tool calls of the current batch, keyed by their local correlation key.
///
/// Owned by one conversation; cleared whenever a new `tool_calls` batch
/// arrives. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct ToolCallRegistry {
    entries: Vec<(String, ToolCall)>,
    positions: HashMap<String, usize>,
    batches: u64,
}

impl ToolCallRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry keyed by `tool_call.id`.
    pub fn upsert(&mut self, tool_call: ToolCall) -> Option<ToolCall> {
        let key = tool_call.id.clone();
        self.insert(key, tool_call)
    }

    /// Insert or replace under an explicit key. Returns the previous value.
    pub fn insert(&mut self, key: impl Into<String>, tool_call: ToolCall) -> Option<ToolCall> {
        let key = key.into();
        match self.positions.get(&key) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position].1, tool_call)),
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, tool_call));
                None
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ToolCall> {
        self.positions
            .get(key)
            .map(|&position| &self.entries[position].1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    pub fn values(&self) -> impl Iterator<Item = &ToolCall> {
        self.entries.iter().map(|(_, tool_call)| tool_call)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    /// Clear for a new batch and return its sequence number, starting at 1.
    /// The sequence survives `clear`, so it distinguishes batches of one
    /// conversation.
    pub fn begin_batch(&mut self) -> u64 {
        self.clear();
        self.batches += 1;
        self.batches
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of the entry a tool result with `result_id` belongs to.
    ///
    /// Tiers, each tried across every entry before the next: exact server id,
    /// stored id containing `result_id`, then key containment in either
    /// direction. Overlapping ids resolve to the earliest inserted entry.
    #[must_use]
    pub fn resolve(&self, result_id: &str) -> Option<&str> {
        let result_id = result_id.trim();
        if result_id.is_empty() {
            return None;
        }

        self.entries
            .iter()
            .find(|(_, tool_call)| tool_call.tool_call_id.as_deref() == Some(result_id))
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(_, tool_call)| tool_call.id.contains(result_id))
            })
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|(key, _)| {
                        key.contains(result_id)
                            || (!key.is_empty() && result_id.contains(key.as_str()))
                    })
            })
            .map(|(key, _)| key.as_str())
    }
}
