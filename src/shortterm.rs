//! The short-term buffer: a bounded, in-memory FIFO working set with
//! keyword-overlap lookup. Cleared on process end; nothing here is
//! persisted — this tier is working memory, not a durable store.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::constants::short_term as cfg;
use crate::textutil;

/// The kind of a short-term entry, used only for display/grouping — the
/// buffer itself does not branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShortTermKind {
    Contextual,
    Factual,
    Preference,
    Procedural,
    Temporal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShortTermMetadata {
    ConversationContext { conversation_id: String, importance: f32 },
    None,
}

/// A single entry in the working-memory buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermEntry {
    pub id: Uuid,
    pub content: String,
    pub entry_type: ShortTermKind,
    pub importance: f32,
    pub metadata: ShortTermMetadata,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl ShortTermEntry {
    #[must_use]
    pub fn new(content: impl Into<String>, entry_type: ShortTermKind, importance: f32, metadata: ShortTermMetadata) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            entry_type,
            importance: importance.clamp(0.0, 1.0),
            metadata,
            created_at: now,
            last_accessed: now,
        }
    }
}

/// FIFO-bounded working memory, single-writer via its internal lock.
pub struct ShortTermBuffer {
    entries: Arc<RwLock<VecDeque<ShortTermEntry>>>,
    capacity: usize,
}

impl ShortTermBuffer {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { entries: Arc::new(RwLock::new(VecDeque::new())), capacity }
    }

    /// Append an entry, trimming from the front if over capacity.
    #[instrument(skip(self, content, metadata))]
    pub async fn add(&self, content: impl Into<String>, entry_type: ShortTermKind, importance: f32, metadata: ShortTermMetadata) -> Uuid {
        let entry = ShortTermEntry::new(content, entry_type, importance, metadata);
        let id = entry.id;
        let mut entries = self.entries.write().await;
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        debug!(size = entries.len(), "short-term buffer updated");
        id
    }

    /// Entries whose tokenized content shares at least one token with
    /// `query`'s tokens (both filtered to length > `MIN_TOKEN_LEN`).
    #[instrument(skip(self, query))]
    pub async fn search_by_overlap(&self, query: &str) -> Vec<ShortTermEntry> {
        let query_tokens = textutil::tokenize(query, cfg::MIN_TOKEN_LEN);
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| {
                let entry_tokens = textutil::tokenize(&e.content, cfg::MIN_TOKEN_LEN);
                entry_tokens.iter().any(|t| query_tokens.contains(t))
            })
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn recent(&self, limit: usize) -> Vec<ShortTermEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }
}

impl Default for ShortTermBuffer {
    fn default() -> Self {
        Self::new(cfg::CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_trims_from_front_over_capacity() {
        let buffer = ShortTermBuffer::new(2);
        buffer.add("first", ShortTermKind::Contextual, 0.5, ShortTermMetadata::None).await;
        buffer.add("second", ShortTermKind::Contextual, 0.5, ShortTermMetadata::None).await;
        buffer.add("third", ShortTermKind::Contextual, 0.5, ShortTermMetadata::None).await;
        let recent = buffer.recent(10).await;
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|e| e.content != "first"));
    }

    #[tokio::test]
    async fn overlap_search_matches_shared_tokens() {
        let buffer = ShortTermBuffer::new(10);
        buffer
            .add("user prefers dark roast coffee", ShortTermKind::Preference, 0.6, ShortTermMetadata::None)
            .await;
        buffer
            .add("unrelated entry about tax season", ShortTermKind::Factual, 0.4, ShortTermMetadata::None)
            .await;
        let results = buffer.search_by_overlap("coffee roast preferences").await;
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("coffee"));
    }

    #[tokio::test]
    async fn empty_buffer_returns_no_overlap_matches() {
        let buffer = ShortTermBuffer::new(10);
        assert!(buffer.search_by_overlap("anything").await.is_empty());
    }
}
