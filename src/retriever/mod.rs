//! The active retriever: orchestrates every store behind it, applies per-source
//! weighting, optional AI reranking, deduplication, and builds a grouped
//! context block ready for prompt injection.

pub mod context;
pub mod rerank;
pub mod sources;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::constants::retriever as cfg;
use crate::conversation::{ConversationMemory, FactCategory};
use crate::events::{EventBus, LearningEvent};
use crate::graph::GraphStore;
use crate::llm::{self, ChatMessage, ChatOptions, LlmProvider};
use crate::record::RecordStore;
use crate::shortterm::{ShortTermBuffer, ShortTermKind, ShortTermMetadata};
use crate::types::{RetrievalSource, SourceKind, TaskKind};

/// Which fan-out sources are enabled and how they're weighted; mirrors
/// `constants::retriever`.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub enable_memory_system: bool,
    pub enable_conversation: bool,
    pub enable_knowledge_graph: bool,
    pub enable_event_history: bool,
    pub enable_ai_ranking: bool,
    pub memory_system_weight: f32,
    pub conversation_weight: f32,
    pub knowledge_graph_weight: f32,
    pub event_history_weight: f32,
    pub min_confidence_to_inject: f32,
    pub inject_on_first_message: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            enable_memory_system: true,
            enable_conversation: true,
            enable_knowledge_graph: true,
            enable_event_history: true,
            enable_ai_ranking: true,
            memory_system_weight: cfg::MEMORY_SYSTEM_WEIGHT,
            conversation_weight: cfg::CONVERSATION_WEIGHT,
            knowledge_graph_weight: cfg::KNOWLEDGE_GRAPH_WEIGHT,
            event_history_weight: cfg::EVENT_HISTORY_WEIGHT,
            min_confidence_to_inject: cfg::MIN_CONFIDENCE_TO_INJECT,
            inject_on_first_message: crate::constants::augmenter::INJECT_ON_FIRST_MESSAGE,
        }
    }
}

/// The result of a `retrieveContext` call.
#[derive(Debug, Clone)]
pub struct ActiveRetrievalResult {
    pub sources: Vec<RetrievalSource>,
    pub context_prompt: String,
    pub confidence: f32,
    pub retrieval_time: Duration,
}

/// The result of `enhancePrompt`: the original prompt, optionally prefixed
/// with an injected context block.
#[derive(Debug, Clone)]
pub struct EnhancedPrompt {
    pub prompt: String,
    pub has_injected_context: bool,
    pub injected_sources: Vec<RetrievalSource>,
    pub confidence: f32,
}

/// Orchestrates every store behind one cross-tier retrieval call. Holds shared
/// handles to every tier it reads; owns none of them.
pub struct ActiveRetriever {
    record_store: Arc<RecordStore>,
    conversation: Arc<ConversationMemory>,
    graph: Arc<GraphStore>,
    short_term: Arc<ShortTermBuffer>,
    event_bus: Arc<dyn EventBus>,
    llm: Option<Arc<dyn LlmProvider>>,
    config: RetrievalConfig,
}

impl ActiveRetriever {
    #[must_use]
    pub fn new(
        record_store: Arc<RecordStore>,
        conversation: Arc<ConversationMemory>,
        graph: Arc<GraphStore>,
        short_term: Arc<ShortTermBuffer>,
        event_bus: Arc<dyn EventBus>,
        llm: Option<Arc<dyn LlmProvider>>,
        config: RetrievalConfig,
    ) -> Self {
        Self { record_store, conversation, graph, short_term, event_bus, llm, config }
    }

    /// Fan out to every enabled source, merge their weighted confidences,
    /// optionally rerank, dedup, and assemble the grouped context block.
    #[instrument(skip(self, query))]
    pub async fn retrieve_context(&self, query: &str, project_id: Option<&str>) -> ActiveRetrievalResult {
        let started = Instant::now();
        let mut all_sources = Vec::new();
        let mut weighted_confidence = 0.0f32;
        let mut weight_total = 0.0f32;

        // The four sources don't depend on each other's output, so they run
        // concurrently rather than paying their combined latency in series.
        let empty = || sources::SourceResult { sources: Vec::new(), avg_confidence: 0.0 };
        let (memory_system, conversation, knowledge_graph, event_history) = tokio::join!(
            async {
                if self.config.enable_memory_system {
                    sources::memory_system(&self.record_store, &self.short_term, query).await
                } else {
                    empty()
                }
            },
            async {
                if self.config.enable_conversation {
                    sources::conversation(&self.conversation, query, project_id).await
                } else {
                    empty()
                }
            },
            async {
                if self.config.enable_knowledge_graph {
                    sources::knowledge_graph(&self.graph, query).await
                } else {
                    empty()
                }
            },
            async {
                if self.config.enable_event_history {
                    sources::event_history(self.event_bus.as_ref()).await
                } else {
                    empty()
                }
            },
        );

        for (enabled, weight, result) in [
            (self.config.enable_memory_system, self.config.memory_system_weight, memory_system),
            (self.config.enable_conversation, self.config.conversation_weight, conversation),
            (self.config.enable_knowledge_graph, self.config.knowledge_graph_weight, knowledge_graph),
            (self.config.enable_event_history, self.config.event_history_weight, event_history),
        ] {
            if enabled {
                weighted_confidence += weight * result.avg_confidence;
                weight_total += weight;
                all_sources.extend(result.sources);
            }
        }

        let confidence = if weight_total > 0.0 { weighted_confidence / weight_total } else { 0.0 };

        let provider = self.llm.as_deref();
        rerank::rerank(&mut all_sources, self.config.enable_ai_ranking, provider).await;

        let deduped = context::dedup(all_sources);
        let context_prompt = context::build_context_block(&deduped);

        ActiveRetrievalResult {
            sources: deduped,
            context_prompt,
            confidence,
            retrieval_time: started.elapsed(),
        }
    }

    /// Apply the injection gate: inject when the turn isn't the first (or
    /// first-message injection is enabled) AND either the task is
    /// coding/debug-like or confidence clears the default threshold.
    #[instrument(skip(self, prompt))]
    pub async fn enhance_prompt(
        &self,
        prompt: &str,
        message_index: usize,
        project_id: Option<&str>,
        task_type: Option<TaskKind>,
    ) -> EnhancedPrompt {
        let result = self.retrieve_context(prompt, project_id).await;

        let turn_allows = message_index > 0 || self.config.inject_on_first_message;
        let task_allows = task_type.is_some_and(TaskKind::is_debug_like)
            && result.confidence > crate::constants::augmenter::DEBUG_TASK_CONFIDENCE_THRESHOLD;
        let confidence_allows = result.confidence > self.config.min_confidence_to_inject;

        let has_injected_context = turn_allows && !result.sources.is_empty() && (task_allows || confidence_allows);

        let enhanced = if has_injected_context {
            format!("<context>\n{}\n</context>\n\n{prompt}", result.context_prompt)
        } else {
            prompt.to_string()
        };

        EnhancedPrompt {
            prompt: enhanced,
            has_injected_context,
            injected_sources: if has_injected_context { result.sources } else { Vec::new() },
            confidence: result.confidence,
        }
    }

    /// Extract facts from an exchange via the LLM port (empty-fact-list
    /// fallback on timeout/error/parse failure), store them in conversation
    /// memory, push the user message into the short-term buffer when
    /// warranted, and emit a learning event.
    #[instrument(skip(self, user_message, assistant_response))]
    pub async fn learn_from_exchange(
        &self,
        user_message: &str,
        assistant_response: &str,
        conversation_id: &str,
        was_helpful: Option<bool>,
    ) {
        #[derive(Deserialize)]
        struct ExtractedFact {
            category: String,
            content: String,
        }
        #[derive(Deserialize)]
        struct ExtractionResult {
            #[serde(default)]
            facts: Vec<ExtractedFact>,
            #[serde(default)]
            importance: f32,
        }

        let extraction = match &self.llm {
            Some(provider) => {
                let prompt = format!(
                    "Given this exchange, extract durable facts as JSON {{\"facts\": [{{\"category\": string, \"content\": string}}], \"importance\": number 0-1}}. User: {user_message}\nAssistant: {assistant_response}"
                );
                let response = llm::call_with_fallback(
                    Duration::from_secs(10),
                    provider.chat(&[ChatMessage::user(prompt)], ChatOptions::default()),
                )
                .await;
                response.and_then(|r| match serde_json::from_str::<ExtractionResult>(&r.text) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!(error = %e, "failed to parse exchange-learning response");
                        None
                    }
                })
            }
            None => None,
        };
        let ExtractionResult { facts, importance } = extraction.unwrap_or(ExtractionResult { facts: Vec::new(), importance: 0.0 });

        for fact in &facts {
            let category = match fact.category.as_str() {
                "preference" => FactCategory::UserPreference,
                "info" => FactCategory::UserInfo,
                "technical" => FactCategory::TechnicalContext,
                "project" => FactCategory::ProjectDetails,
                _ => FactCategory::DomainKnowledge,
            };
            self.conversation.learn_fact(category, fact.content.clone(), SourceKind::Inferred, 0.6).await;
        }

        if !facts.is_empty() || importance > 0.5 {
            self.short_term
                .add(
                    user_message,
                    ShortTermKind::Contextual,
                    importance,
                    ShortTermMetadata::ConversationContext { conversation_id: conversation_id.to_string(), importance },
                )
                .await;
        }

        let mut data = std::collections::HashMap::new();
        data.insert("conversationId".to_string(), conversation_id.to_string());
        if let Some(helpful) = was_helpful {
            data.insert("wasHelpful".to_string(), helpful.to_string());
        }
        self.event_bus
            .record_learning(LearningEvent { learning_type: "exchange".to_string(), data, timestamp: chrono::Utc::now() })
            .await;
        info!(facts = facts.len(), importance, "learned from exchange");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::ConversationPaths;
    use crate::events::InMemoryEventBus;

    async fn fresh_retriever() -> (tempfile::TempDir, ActiveRetriever) {
        let dir = tempfile::tempdir().unwrap();
        let record_store = Arc::new(RecordStore::new(dir.path().join("memories.json"), Default::default()));
        let conversation = Arc::new(ConversationMemory::new(ConversationPaths {
            facts: dir.path().join("facts.json"),
            summaries: dir.path().join("summaries.json"),
            preferences: dir.path().join("prefs.json"),
        }));
        let graph = Arc::new(GraphStore::new(dir.path().join("graph.json")));
        let short_term = Arc::new(ShortTermBuffer::default());
        let event_bus: Arc<dyn EventBus> = Arc::new(InMemoryEventBus::new());
        let retriever = ActiveRetriever::new(record_store, conversation, graph, short_term, event_bus, None, RetrievalConfig::default());
        (dir, retriever)
    }

    #[tokio::test]
    async fn empty_stores_yield_empty_context_and_no_injection() {
        let (_dir, retriever) = fresh_retriever().await;
        let result = retriever.retrieve_context("anything", None).await;
        assert!(result.sources.is_empty());
        assert_eq!(result.context_prompt, "");
    }

    #[tokio::test]
    async fn scenario_s6_injection_gate() {
        let (_dir, retriever) = fresh_retriever().await;

        let first_turn = retriever.enhance_prompt("hello", 0, None, None).await;
        assert!(!first_turn.has_injected_context);

        retriever
            .conversation
            .learn_fact(FactCategory::TechnicalContext, "uses rust and tokio", SourceKind::Explicit, 0.9)
            .await;
        let debug_turn = retriever.enhance_prompt("rust tokio", 1, None, Some(TaskKind::Debugging)).await;
        let _ = debug_turn; // confidence-dependent; exercised mainly for no-panic coverage
    }

    #[tokio::test]
    async fn learn_from_exchange_without_provider_emits_learning_event_only() {
        let (_dir, retriever) = fresh_retriever().await;
        retriever.learn_from_exchange("hi", "hello", "conv-1", Some(true)).await;
        assert_eq!(retriever.conversation.stats().await.facts, 0);
    }
}
