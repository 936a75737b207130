//! A thin orchestrator over the active retriever: applies the injection
//! gate, forwards exchange learning, and surfaces procedural and fact
//! suggestions.

use std::sync::Arc;

use tracing::instrument;

use crate::constants::augmenter as cfg;
use crate::conversation::{ConversationMemory, Fact};
use crate::record::{Record, RecordKind, RecordMetadata, RecordStore};
use crate::retriever::{ActiveRetrievalResult, ActiveRetriever, EnhancedPrompt};
use crate::types::TaskKind;

/// Up to 3 procedural suggestions and up to 2 facts, surfaced alongside a
/// prompt enhancement for UI-level hinting.
#[derive(Debug, Clone, Default)]
pub struct Suggestions {
    pub procedures: Vec<Record>,
    pub facts: Vec<Fact>,
}

/// Wraps an `ActiveRetriever`, adding nothing to its retrieval algorithm —
/// just the gate and the suggestion surface described for this component.
pub struct Augmenter {
    retriever: Arc<ActiveRetriever>,
    record_store: Arc<RecordStore>,
    conversation: Arc<ConversationMemory>,
}

impl Augmenter {
    #[must_use]
    pub fn new(retriever: Arc<ActiveRetriever>, record_store: Arc<RecordStore>, conversation: Arc<ConversationMemory>) -> Self {
        Self { retriever, record_store, conversation }
    }

    /// Delegate straight to the retriever's own `retrieveContext`.
    #[instrument(skip(self, query))]
    pub async fn retrieve_context(&self, query: &str, project_id: Option<&str>) -> ActiveRetrievalResult {
        self.retriever.retrieve_context(query, project_id).await
    }

    /// Delegate to the retriever's injection gate.
    #[instrument(skip(self, prompt))]
    pub async fn enhance_prompt(
        &self,
        prompt: &str,
        message_index: usize,
        project_id: Option<&str>,
        task_type: Option<TaskKind>,
    ) -> EnhancedPrompt {
        self.retriever.enhance_prompt(prompt, message_index, project_id, task_type).await
    }

    /// Delegate to the retriever's exchange-learning path.
    #[instrument(skip(self, user_message, assistant_response))]
    pub async fn learn_from_exchange(&self, user_message: &str, assistant_response: &str, conversation_id: &str, was_helpful: Option<bool>) {
        self.retriever.learn_from_exchange(user_message, assistant_response, conversation_id, was_helpful).await;
    }

    /// Up to `MAX_PROCEDURAL_SUGGESTIONS` procedural records with
    /// `successRate > 0.7`, plus up to `MAX_FACT_SUGGESTIONS` conversation
    /// facts with `confidence > 0.8`, each group sorted by confidence
    /// descending.
    #[instrument(skip(self, _recent_messages))]
    pub async fn suggestions(&self, _conversation_id: &str, _recent_messages: &[String], project_id: Option<&str>) -> Suggestions {
        let _ = project_id; // procedural/fact suggestions aren't scoped by project upstream

        let candidates = self
            .record_store
            .retrieve(RecordKind::Procedural, None, None, None, usize::MAX)
            .await;
        let mut procedures: Vec<Record> = candidates
            .into_iter()
            .filter(|r| matches!(&r.metadata, RecordMetadata::Procedural { success_rate, .. } if *success_rate > cfg::PROCEDURAL_SUGGESTION_MIN_SUCCESS_RATE))
            .collect();
        procedures.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        procedures.truncate(cfg::MAX_PROCEDURAL_SUGGESTIONS);

        let facts = self
            .conversation
            .facts_above_confidence(cfg::FACT_SUGGESTION_MIN_CONFIDENCE, cfg::MAX_FACT_SUGGESTIONS)
            .await;

        Suggestions { procedures, facts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{ConversationPaths, FactCategory};
    use crate::events::InMemoryEventBus;
    use crate::graph::GraphStore;
    use crate::record::RecordStoreConfig;
    use crate::retriever::RetrievalConfig;
    use crate::shortterm::ShortTermBuffer;
    use crate::types::SourceKind;

    async fn fresh_augmenter() -> (tempfile::TempDir, Augmenter) {
        let dir = tempfile::tempdir().unwrap();
        let record_store = Arc::new(RecordStore::new(dir.path().join("memories.json"), RecordStoreConfig::default()));
        let conversation = Arc::new(ConversationMemory::new(ConversationPaths {
            facts: dir.path().join("facts.json"),
            summaries: dir.path().join("summaries.json"),
            preferences: dir.path().join("prefs.json"),
        }));
        let graph = Arc::new(GraphStore::new(dir.path().join("graph.json")));
        let short_term = Arc::new(ShortTermBuffer::default());
        let event_bus: Arc<dyn crate::events::EventBus> = Arc::new(InMemoryEventBus::new());
        let retriever = Arc::new(ActiveRetriever::new(
            Arc::clone(&record_store),
            Arc::clone(&conversation),
            graph,
            short_term,
            event_bus,
            None,
            RetrievalConfig::default(),
        ));
        (dir, Augmenter::new(retriever, record_store, conversation))
    }

    #[tokio::test]
    async fn suggestions_filters_by_success_rate_and_confidence() {
        let (_dir, augmenter) = fresh_augmenter().await;

        let strong = Record::new(
            RecordKind::Procedural,
            "workflow",
            "deploy",
            "run the release checklist",
            0.9,
            SourceKind::Explicit,
            RecordMetadata::Procedural { success_rate: 0.9, average_duration_secs: 60.0, execution_count: 10 },
        );
        let weak = Record::new(
            RecordKind::Procedural,
            "workflow",
            "risky_deploy",
            "skip the checklist",
            0.9,
            SourceKind::Explicit,
            RecordMetadata::Procedural { success_rate: 0.2, average_duration_secs: 60.0, execution_count: 10 },
        );
        augmenter.record_store.store(strong).await;
        augmenter.record_store.store(weak).await;

        augmenter
            .conversation
            .learn_fact(FactCategory::UserInfo, "works at Acme", SourceKind::Explicit, 0.95)
            .await;

        let suggestions = augmenter.suggestions("conv-1", &[], None).await;
        assert_eq!(suggestions.procedures.len(), 1);
        assert_eq!(suggestions.procedures[0].key, "deploy");
        assert_eq!(suggestions.facts.len(), 1);
    }
}
