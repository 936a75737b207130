//! Conversation memory: a fact catalogue, conversation summaries, and
//! a user-preference map, backed by regex-driven extraction and
//! LLM-assisted summarization with a deterministic fallback.

pub mod extraction;
pub mod model;

pub use model::{Fact, FactCategory, Summary};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::constants::conversation as cfg;
use crate::llm::{self, ChatMessage, ChatOptions, LlmProvider};
use crate::persist;
use crate::textutil;
use crate::types::SourceKind;

/// The three file-backed keys conversation memory persists, plus the
/// location each lives at.
#[derive(Debug, Clone)]
pub struct ConversationPaths {
    pub facts: PathBuf,
    pub summaries: PathBuf,
    pub preferences: PathBuf,
}

/// The result of `retrieve_context`: a bundle ready for the active
/// retriever to fold in.
#[derive(Debug, Clone, Default)]
pub struct ConversationContext {
    pub summaries: Vec<Summary>,
    pub facts: Vec<Fact>,
    pub preferences: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationStats {
    pub facts: usize,
    pub summaries: usize,
    pub preferences: usize,
}

pub struct ConversationMemory {
    facts: Arc<RwLock<Vec<Fact>>>,
    summaries: Arc<RwLock<Vec<Summary>>>,
    preferences: Arc<RwLock<HashMap<String, String>>>,
    extractor: extraction::ExtractorBank,
    paths: ConversationPaths,
}

impl ConversationMemory {
    #[must_use]
    pub fn new(paths: ConversationPaths) -> Self {
        let facts: Vec<Fact> = persist::load_json(&paths.facts).unwrap_or_default();
        let summaries: Vec<Summary> = persist::load_json(&paths.summaries).unwrap_or_default();
        let preferences: HashMap<String, String> = persist::load_json(&paths.preferences).unwrap_or_default();
        debug!(facts = facts.len(), summaries = summaries.len(), "conversation memory loaded");
        Self {
            facts: Arc::new(RwLock::new(facts)),
            summaries: Arc::new(RwLock::new(summaries)),
            preferences: Arc::new(RwLock::new(preferences)),
            extractor: extraction::ExtractorBank::new(),
            paths,
        }
    }

    async fn persist_facts(&self) {
        let facts = self.facts.read().await;
        persist::save_json(&self.paths.facts, &*facts);
    }

    async fn persist_summaries(&self) {
        let summaries = self.summaries.read().await;
        persist::save_json(&self.paths.summaries, &*summaries);
    }

    async fn persist_preferences(&self) {
        let preferences = self.preferences.read().await;
        persist::save_json(&self.paths.preferences, &*preferences);
    }

    /// Learn a single fact, skipping a case-insensitive content duplicate.
    /// Returns `None` when skipped, so repeated calls are idempotent.
    #[instrument(skip(self, text))]
    pub async fn learn_fact(&self, category: FactCategory, text: impl Into<String>, source: SourceKind, confidence: f32) -> Option<Uuid> {
        let text = text.into();
        let lower = text.to_lowercase();
        let mut facts = self.facts.write().await;
        if facts.iter().any(|f| f.text.to_lowercase() == lower) {
            return None; // idempotent learn, per the testable-properties scenario
        }
        let fact = Fact::new(category, text, source, confidence);
        let id = fact.id;
        facts.push(fact);
        drop(facts);
        self.persist_facts().await;
        Some(id)
    }

    /// Run the extraction pattern bank over `message` and learn each match.
    #[instrument(skip(self, message))]
    pub async fn extract_from_message(&self, message: &str) -> Vec<Uuid> {
        let matches = self.extractor.extract(message);
        let mut learned = Vec::new();
        for (category, text) in matches {
            if let Some(id) = self.learn_fact(category, text, SourceKind::Inferred, 0.7).await {
                learned.push(id);
            }
        }
        learned
    }

    pub async fn set_preference(&self, key: impl Into<String>, value: impl Into<String>) {
        self.preferences.write().await.insert(key.into(), value.into());
        self.persist_preferences().await;
    }

    /// If `message_index` lands on `summarizationThreshold`, produce a
    /// summary: an LLM-backed structured summary when `llm` is available
    /// and responds in time, else the deterministic fact-based fallback.
    #[instrument(skip(self, llm))]
    pub async fn maybe_summarize(&self, message_index: usize, llm: Option<&dyn LlmProvider>, project_id: Option<String>) -> Option<Summary> {
        if message_index == 0 || message_index % cfg::SUMMARIZATION_THRESHOLD != 0 {
            return None;
        }

        let summary = match llm {
            Some(provider) => self.summarize_via_llm(provider, project_id.clone()).await,
            None => None,
        };
        let summary = match summary {
            Some(s) => s,
            None => self.fallback_summary(project_id).await,
        };

        let mut summaries = self.summaries.write().await;
        summaries.push(summary.clone());
        if summaries.len() > cfg::MAX_SUMMARIES_STORED {
            summaries.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
            summaries.truncate(cfg::MAX_SUMMARIES_STORED);
        }
        drop(summaries);
        self.persist_summaries().await;
        Some(summary)
    }

    async fn summarize_via_llm(&self, provider: &dyn LlmProvider, project_id: Option<String>) -> Option<Summary> {
        let facts = self.facts.read().await;
        let fact_text: String = facts.iter().rev().take(20).map(|f| f.text.clone()).collect::<Vec<_>>().join("; ");
        drop(facts);

        let prompt = format!(
            "Summarize the conversation so far as JSON {{\"summary\": string, \"keyTopics\": [string], \"importance\": number between 0 and 1}}. Known facts: {fact_text}"
        );
        let response = llm::call_with_fallback(
            std::time::Duration::from_secs(10),
            provider.chat(&[ChatMessage::user(prompt)], ChatOptions::default()),
        )
        .await?;

        #[derive(Deserialize)]
        struct LlmSummary {
            summary: String,
            #[serde(default)]
            key_topics: Vec<String>,
            importance: f32,
        }

        match serde_json::from_str::<LlmSummary>(&response.text) {
            Ok(parsed) => Some(Summary {
                id: Uuid::new_v4(),
                timestamp: chrono::Utc::now(),
                project_id,
                text: parsed.summary,
                key_topics: parsed.key_topics,
                message_count: 0,
                importance: parsed.importance.clamp(0.0, 1.0),
            }),
            Err(e) => {
                warn!(error = %e, "failed to parse LLM summary, truncating raw text");
                Some(Summary {
                    id: Uuid::new_v4(),
                    timestamp: chrono::Utc::now(),
                    project_id,
                    text: response.text.chars().take(cfg::FALLBACK_SUMMARY_TRUNCATE_CHARS).collect(),
                    key_topics: Vec::new(),
                    message_count: 0,
                    importance: 0.5,
                })
            }
        }
    }

    async fn fallback_summary(&self, project_id: Option<String>) -> Summary {
        let facts = self.facts.read().await;
        let recent: Vec<String> = facts.iter().rev().take(cfg::FALLBACK_FACT_SAMPLE).map(|f| f.text.clone()).collect();
        let fact_count = facts.len();
        drop(facts);

        let text = if recent.is_empty() {
            "Topics discussed: (no facts learned yet)".to_string()
        } else {
            format!("Topics discussed: {}", recent.join(", "))
        };
        let importance = (fact_count as f32 / 20.0).min(0.8).max(0.3);

        Summary {
            id: Uuid::new_v4(),
            timestamp: chrono::Utc::now(),
            project_id,
            text,
            key_topics: recent,
            message_count: fact_count,
            importance,
        }
    }

    /// Filter summaries/facts by token overlap with `query`, update
    /// `last_referenced_at` on matched facts, and return the bundle the
    /// active retriever folds in.
    #[instrument(skip(self, query))]
    pub async fn retrieve_context(&self, query: &str, project_id: Option<&str>) -> ConversationContext {
        let tokens = textutil::tokenize(query, 2);

        let summaries = self.summaries.read().await;
        let mut matched_summaries: Vec<Summary> = summaries
            .iter()
            .filter(|s| project_id.is_none_or(|p| s.project_id.as_deref() == Some(p)))
            .filter(|s| s.importance > 0.7 || s.key_topics.iter().any(|t| tokens.contains(&t.to_lowercase())))
            .cloned()
            .collect();
        drop(summaries);
        matched_summaries.sort_by(|a, b| b.importance.partial_cmp(&a.importance).unwrap_or(std::cmp::Ordering::Equal));
        matched_summaries.truncate(cfg::MAX_RETRIEVED_CONTEXT);

        let mut facts = self.facts.write().await;
        let now = chrono::Utc::now();
        let mut matched_facts: Vec<Fact> = Vec::new();
        for fact in facts.iter_mut() {
            let lower = fact.text.to_lowercase();
            if tokens.iter().any(|t| lower.contains(t.as_str())) {
                fact.last_referenced_at = Some(now);
                matched_facts.push(fact.clone());
            }
        }
        drop(facts);
        self.persist_facts().await;

        matched_facts.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        matched_facts.truncate(cfg::MAX_RETRIEVED_CONTEXT * 2);

        ConversationContext {
            summaries: matched_summaries,
            facts: matched_facts,
            preferences: self.preferences.read().await.clone(),
        }
    }

    /// Facts at or above `min_confidence`, sorted by confidence descending.
    /// Used by the augmenter's fact-suggestion surface.
    pub async fn facts_above_confidence(&self, min_confidence: f32, limit: usize) -> Vec<Fact> {
        let facts = self.facts.read().await;
        let mut matches: Vec<Fact> = facts.iter().filter(|f| f.confidence > min_confidence).cloned().collect();
        matches.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(limit);
        matches
    }

    pub async fn stats(&self) -> ConversationStats {
        ConversationStats {
            facts: self.facts.read().await.len(),
            summaries: self.summaries.read().await.len(),
            preferences: self.preferences.read().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_paths() -> (tempfile::TempDir, ConversationPaths) {
        let dir = tempfile::tempdir().unwrap();
        let paths = ConversationPaths {
            facts: dir.path().join("facts.json"),
            summaries: dir.path().join("summaries.json"),
            preferences: dir.path().join("prefs.json"),
        };
        (dir, paths)
    }

    #[tokio::test]
    async fn learn_fact_is_idempotent() {
        let (_dir, paths) = fresh_paths();
        let memory = ConversationMemory::new(paths);
        let first = memory.learn_fact(FactCategory::UserPreference, "Loves Rust", SourceKind::Explicit, 0.9).await;
        let second = memory.learn_fact(FactCategory::UserPreference, "loves rust", SourceKind::Explicit, 0.9).await;
        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(memory.stats().await.facts, 1);
    }

    #[tokio::test]
    async fn extraction_learns_facts_from_message() {
        let (_dir, paths) = fresh_paths();
        let memory = ConversationMemory::new(paths);
        let learned = memory.extract_from_message("my name is Alice and I prefer dark roast coffee").await;
        assert!(!learned.is_empty());
    }

    #[tokio::test]
    async fn scenario_s4_summarization_fallback() {
        let (_dir, paths) = fresh_paths();
        let memory = ConversationMemory::new(paths);
        for i in 0..5 {
            memory
                .learn_fact(FactCategory::DomainKnowledge, format!("fact {i}"), SourceKind::Inferred, 0.6)
                .await;
        }
        let summary = memory.maybe_summarize(15, None, None).await.unwrap();
        assert!(summary.text.starts_with("Topics discussed:"));
        assert_eq!(summary.key_topics.len(), 5);
        assert!((summary.importance - 0.3).abs() < 1e-6); // 5/20=0.25 clamped up to 0.3
    }

    #[tokio::test]
    async fn summarization_only_fires_on_threshold() {
        let (_dir, paths) = fresh_paths();
        let memory = ConversationMemory::new(paths);
        assert!(memory.maybe_summarize(0, None, None).await.is_none());
        assert!(memory.maybe_summarize(14, None, None).await.is_none());
        assert!(memory.maybe_summarize(15, None, None).await.is_some());
    }

    #[tokio::test]
    async fn retrieve_context_matches_on_shared_tokens_and_updates_last_referenced() {
        let (_dir, paths) = fresh_paths();
        let memory = ConversationMemory::new(paths);
        memory.learn_fact(FactCategory::UserPreference, "loves pour-over coffee", SourceKind::Explicit, 0.9).await;
        let ctx = memory.retrieve_context("coffee brewing", None).await;
        assert_eq!(ctx.facts.len(), 1);
        assert!(ctx.facts[0].last_referenced_at.is_some());
    }
}
