//! The root composition: one `MemoryEngine` owns every store behind an
//! `Arc` and hands them to the retriever/augmenter by reference. No store
//! is ever a global singleton — constructing a second `MemoryEngine`
//! (e.g. in a test) yields fully independent state.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::augmenter::Augmenter;
use crate::conversation::{ConversationMemory, ConversationPaths};
use crate::events::{EventBus, InMemoryEventBus};
use crate::graph::{GraphStats, GraphStore};
use crate::llm::{LlmProvider, NullLlmProvider};
use crate::longterm::{LongTermConfig, LongTermStats, LongTermStore};
use crate::paths::AppPaths;
use crate::project_memory::ProjectMemoryStore;
use crate::record::{RecordStore, RecordStoreConfig, RecordStoreStats};
use crate::retriever::{ActiveRetriever, RetrievalConfig};
use crate::shortterm::ShortTermBuffer;

/// Aggregated read-only health snapshot across every store, in place of
/// exposing each store's mutable internals for UI binding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HealthReport {
    pub record_store: RecordStoreStats,
    pub long_term: LongTermStats,
    pub graph: GraphStats,
    pub short_term_entries: usize,
    pub conversation_facts: usize,
    pub conversation_summaries: usize,
}

/// Everything needed to construct a `MemoryEngine` beyond its on-disk
/// location: an optional LLM provider and a choice of event bus. Both
/// default to the deterministic in-process implementations.
pub struct EngineDependencies {
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub event_bus: Arc<dyn EventBus>,
}

impl Default for EngineDependencies {
    fn default() -> Self {
        Self { llm: None, event_bus: Arc::new(InMemoryEventBus::new()) }
    }
}

/// Owns one instance of every tier, constructed once at process start.
pub struct MemoryEngine {
    pub record_store: Arc<RecordStore>,
    /// Decays and persists on its own; not one of the retriever's four
    /// fan-out sources, so queries against it go through this handle
    /// directly rather than through `retriever`/`augmenter`.
    pub long_term: Arc<LongTermStore>,
    pub short_term: Arc<ShortTermBuffer>,
    pub graph: Arc<GraphStore>,
    pub conversation: Arc<ConversationMemory>,
    pub project_memories: Arc<ProjectMemoryStore>,
    pub retriever: Arc<ActiveRetriever>,
    pub augmenter: Arc<Augmenter>,
    event_bus: Arc<dyn EventBus>,
}

impl MemoryEngine {
    /// Construct every store rooted at `paths`, loading any existing
    /// on-disk snapshots, and wire the retriever/augmenter on top.
    #[must_use]
    pub fn new(paths: &AppPaths, deps: EngineDependencies) -> Self {
        let record_store = Arc::new(RecordStore::new(paths.memories_file(), RecordStoreConfig::default()));
        let long_term = Arc::new(LongTermStore::new(paths.long_term_file(), LongTermConfig::default()));
        let short_term = Arc::new(ShortTermBuffer::default());
        let graph = Arc::new(GraphStore::new(paths.graph_file()));
        let conversation = Arc::new(ConversationMemory::new(ConversationPaths {
            facts: paths.conversation_file("facts"),
            summaries: paths.conversation_file("summaries"),
            preferences: paths.conversation_file("prefs"),
        }));
        let project_memories = Arc::new(ProjectMemoryStore::new(paths.project_memories_file()));

        let retriever = Arc::new(ActiveRetriever::new(
            Arc::clone(&record_store),
            Arc::clone(&conversation),
            Arc::clone(&graph),
            Arc::clone(&short_term),
            Arc::clone(&deps.event_bus),
            deps.llm,
            RetrievalConfig::default(),
        ));
        let augmenter = Arc::new(Augmenter::new(Arc::clone(&retriever), Arc::clone(&record_store), Arc::clone(&conversation)));

        info!("memory engine constructed");
        Self {
            record_store,
            long_term,
            short_term,
            graph,
            conversation,
            project_memories,
            retriever,
            augmenter,
            event_bus: deps.event_bus,
        }
    }

    /// Convenience constructor using the null LLM provider and an
    /// in-process event bus — the deterministic-fallback configuration
    /// exercised by every test in this crate.
    #[must_use]
    pub fn with_defaults(paths: &AppPaths) -> Self {
        Self::new(paths, EngineDependencies { llm: Some(Arc::new(NullLlmProvider)), event_bus: Arc::new(InMemoryEventBus::new()) })
    }

    /// Spawn the background decay loops for the stores that run one.
    pub fn spawn_background_tasks(&self) {
        self.record_store.spawn_decay_loop();
        self.long_term.spawn_decay_loop();
    }

    /// Signal every background loop to stop after its current pass. Does
    /// not itself await a final flush; callers that need one should call
    /// each store's own persistence path before dropping the engine.
    pub fn stop_background_tasks(&self) {
        self.record_store.stop();
        self.long_term.stop();
    }

    /// Aggregate every store's `stats()` snapshot into one health report.
    pub async fn health_report(&self) -> HealthReport {
        HealthReport {
            record_store: self.record_store.stats().await,
            long_term: self.long_term.stats().await,
            graph: self.graph.stats().await,
            short_term_entries: self.short_term.len().await,
            conversation_facts: self.conversation.stats().await.facts,
            conversation_summaries: self.conversation.stats().await.summaries,
        }
    }

    #[must_use]
    pub fn event_bus(&self) -> Arc<dyn EventBus> {
        Arc::clone(&self.event_bus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn engine_constructs_with_empty_stores() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::new(dir.path().to_path_buf(), "test-ns");
        let engine = MemoryEngine::with_defaults(&paths);
        let report = engine.health_report().await;
        assert_eq!(report.record_store.total, 0);
        assert_eq!(report.long_term.total, 0);
        assert_eq!(report.graph.entities, 0);
    }

    #[tokio::test]
    async fn two_engines_at_different_paths_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let paths_a = AppPaths::new(dir.path().join("a"), "ns");
        let paths_b = AppPaths::new(dir.path().join("b"), "ns");
        let engine_a = MemoryEngine::with_defaults(&paths_a);
        let engine_b = MemoryEngine::with_defaults(&paths_b);

        engine_a
            .record_store
            .store(crate::record::Record::new(
                crate::record::RecordKind::Semantic,
                "cat",
                "key",
                "value",
                0.9,
                crate::types::SourceKind::Explicit,
                crate::record::RecordMetadata::None,
            ))
            .await;

        assert_eq!(engine_a.health_report().await.record_store.total, 1);
        assert_eq!(engine_b.health_report().await.record_store.total, 0);
    }
}
