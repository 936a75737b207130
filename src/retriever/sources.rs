//! Per-source fetch functions for the active retriever's fan-out: each
//! maps its tier's native results into the common `RetrievalSource` shape
//! and reports an average confidence for the weighted merge.

use chrono::Utc;

use crate::constants::retriever as cfg;
use crate::conversation::ConversationMemory;
use crate::events::{EventBus, EventCategory};
use crate::graph::GraphStore;
use crate::record::{RecordKind, RecordStore};
use crate::shortterm::ShortTermBuffer;
use crate::types::{RetrievalSource, Tier};

/// One enabled source's contribution: its normalized sources plus the
/// average relevance used in the weighted confidence merge.
pub struct SourceResult {
    pub sources: Vec<RetrievalSource>,
    pub avg_confidence: f32,
}

fn avg(sources: &[RetrievalSource]) -> f32 {
    if sources.is_empty() {
        return 0.0;
    }
    sources.iter().map(|s| s.relevance_score).sum::<f32>() / sources.len() as f32
}

/// Union of semantic/episodic/procedural records plus short-term overlap matches,
/// capped by per-tier limits and an overall cap.
pub async fn memory_system(record_store: &RecordStore, short_term: &ShortTermBuffer, query: &str) -> SourceResult {
    let mut sources = Vec::new();

    for (record, score) in record_store.semantic_search(query, cfg::MAX_SEMANTIC_RESULTS).await {
        if score < cfg::MIN_SIMILARITY_THRESHOLD {
            continue;
        }
        sources.push(RetrievalSource::new(record.value, Tier::Semantic, score, "record:semantic"));
    }

    for record in record_store.retrieve(RecordKind::Episodic, None, None, None, cfg::MAX_EPISODIC_RESULTS).await {
        let relevance = crate::record::importance::importance(&record);
        sources.push(RetrievalSource::new(record.value, Tier::Episodic, relevance, "record:episodic"));
    }

    for record in record_store.retrieve(RecordKind::Procedural, None, None, None, cfg::MAX_PROCEDURAL_RESULTS).await {
        let relevance = crate::record::importance::importance(&record);
        sources.push(RetrievalSource::new(record.value, Tier::Procedural, relevance, "record:procedural"));
    }

    for entry in short_term.search_by_overlap(query).await {
        sources.push(RetrievalSource::new(entry.content, Tier::Working, entry.importance, "shortterm:overlap"));
    }

    sources.truncate(cfg::MAX_MEMORY_SYSTEM_RESULTS);
    SourceResult { avg_confidence: avg(&sources), sources }
}

/// Conversation memory's retrieved context mapped to `RetrievalSource`: facts to long-term,
/// summaries to episodic, preferences to semantic at a fixed high
/// relevance.
pub async fn conversation(memory: &ConversationMemory, query: &str, project_id: Option<&str>) -> SourceResult {
    let ctx = memory.retrieve_context(query, project_id).await;
    let mut sources = Vec::new();

    for fact in ctx.facts {
        sources.push(RetrievalSource::new(fact.text, Tier::LongTerm, fact.confidence, "conversation:fact"));
    }
    for summary in ctx.summaries {
        sources.push(RetrievalSource::new(summary.text, Tier::Episodic, summary.importance, "conversation:summary"));
    }
    for (key, value) in ctx.preferences {
        sources.push(RetrievalSource::new(
            format!("{key}: {value}"),
            Tier::Semantic,
            cfg::CONVERSATION_PREFERENCE_RELEVANCE,
            "conversation:preference",
        ));
    }

    SourceResult { avg_confidence: avg(&sources), sources }
}

/// `hybridSearch` + `query`; falls back to a linear scan for entities with
/// any token overlap with the query or a reference count above 3 when
/// nothing else matched.
pub async fn knowledge_graph(graph: &GraphStore, query: &str) -> SourceResult {
    let hits = graph.hybrid_search(query, cfg::MAX_KNOWLEDGE_GRAPH_RESULTS).await;
    let mut sources: Vec<RetrievalSource> = hits
        .into_iter()
        .map(|hit| RetrievalSource::new(hit.entity.name, Tier::Semantic, hit.score.clamp(0.0, 1.0), "graph:hybrid"))
        .collect();

    if sources.is_empty() {
        let mut fallback: Vec<RetrievalSource> = graph
            .all_entities()
            .await
            .into_iter()
            .filter(|e| crate::textutil::shares_token(&e.name, query, 0) || e.reference_count > 3)
            .map(|e| RetrievalSource::new(e.name, Tier::Semantic, 0.3, "graph:fallback"))
            .collect();
        fallback.truncate(cfg::MAX_KNOWLEDGE_GRAPH_RESULTS);
        sources.append(&mut fallback);
    }

    sources.truncate(cfg::MAX_KNOWLEDGE_GRAPH_RESULTS);
    SourceResult { avg_confidence: avg(&sources), sources }
}

/// Last-hour error events (0.8 relevance if unrecoverable, else 0.5) and
/// last-day learning events (0.4 relevance).
pub async fn event_history(bus: &dyn EventBus) -> SourceResult {
    let now = Utc::now();
    let mut sources = Vec::new();

    let errors = bus.query(EventCategory::Error, now - chrono::Duration::hours(1), cfg::MAX_EVENT_RESULTS).await;
    for event in errors {
        if let crate::events::Event::Error(e) = event {
            let relevance = if e.recoverable { cfg::EVENT_RECOVERABLE_RELEVANCE } else { cfg::EVENT_UNRECOVERABLE_RELEVANCE };
            sources.push(RetrievalSource::new(e.message, Tier::Working, relevance, "event:error"));
        }
    }

    let learnings = bus.query(EventCategory::Learning, now - chrono::Duration::days(1), cfg::MAX_EVENT_RESULTS).await;
    for event in learnings {
        if let crate::events::Event::Learning(e) = event {
            sources.push(RetrievalSource::new(e.learning_type, Tier::Working, cfg::EVENT_LEARNING_RELEVANCE, "event:learning"));
        }
    }

    sources.truncate(cfg::MAX_EVENT_RESULTS);
    SourceResult { avg_confidence: avg(&sources), sources }
}
