//! Centralized default configuration values.
//!
//! Mirrors the enumerated defaults in the engine's external-interfaces
//! section so no magic number appears twice.

/// Record store defaults.
pub mod record_store {
    pub const EMBEDDING_DIM: usize = 384;
    pub const MAX_CACHE_SIZE: usize = 500;
    pub const DECAY_HALF_LIFE_DAYS: f64 = 30.0;
    pub const MINIMUM_CONFIDENCE_FOR_RETENTION: f32 = 0.15;
    pub const ENABLE_TIME_DECAY: bool = true;
    pub const ENABLE_SEMANTIC_SEARCH: bool = true;

    // importance() weights
    pub const WEIGHT_RECENCY: f32 = 0.25;
    pub const WEIGHT_FREQUENCY: f32 = 0.20;
    pub const WEIGHT_CONFIDENCE: f32 = 0.30;
    pub const WEIGHT_SOURCE: f32 = 0.15;
    #[allow(dead_code)] // reserved per design notes, not yet wired to a signal
    pub const WEIGHT_FEEDBACK: f32 = 0.10;

    pub const TYPE_BONUS_PROCEDURAL: f32 = 0.2;
    pub const TYPE_BONUS_PROSPECTIVE: f32 = 0.3;
    pub const TYPE_BONUS_SEMANTIC: f32 = 0.1;
    pub const TYPE_BONUS_EPISODIC: f32 = 0.0;

    pub const SOURCE_WEIGHT_EXPLICIT: f32 = 1.0;
    pub const SOURCE_WEIGHT_INFERRED: f32 = 0.7;
    pub const SOURCE_WEIGHT_SYSTEM: f32 = 0.5;

    pub const CONSOLIDATE_SEMANTIC_MAX_AGE_DAYS: i64 = 30;
    pub const CONSOLIDATE_SEMANTIC_MIN_CONFIDENCE: f32 = 0.3;
    pub const CONSOLIDATE_EPISODIC_ARCHIVE_AGE_DAYS: i64 = 90;

    pub const DECAY_LOOP_INTERVAL_SECS: u64 = 3600;

    pub const PATTERN_WINDOW_DAYS: i64 = 30;
    pub const PATTERN_MIN_OCCURRENCES: usize = 3;
}

/// Long-term store defaults.
pub mod long_term {
    pub const BASE_DECAY_RATE: f32 = 0.1;
    pub const MINIMUM_STRENGTH: f32 = 0.1;
    pub const REINFORCEMENT_FACTOR: f32 = 0.2;
    pub const MAX_REINFORCEMENT: f32 = 0.5;
    pub const DECAY_INTERVAL_SECS: u64 = 3600;
    pub const MAX_MEMORIES: usize = 5000;
    pub const AUTO_PRUNE_ENABLED: bool = true;
    pub const DEFAULT_INITIAL_STRENGTH: f32 = 0.8;

    pub const SEARCH_MIN_STRENGTH: f32 = 0.2;
    pub const SEARCH_LIMIT: usize = 20;
    pub const ACTIVE_MIN_STRENGTH: f32 = 0.3;
}

/// Short-term buffer defaults.
pub mod short_term {
    pub const CAPACITY: usize = 200;
    pub const MIN_TOKEN_LEN: usize = 2;
}

/// Knowledge graph defaults.
pub mod graph {
    pub const BFS_MAX_DEPTH: usize = 4;
    pub const STALE_DECAY_DAYS: i64 = 90;
    pub const STALE_MIN_REFERENCE_COUNT: u32 = 2;
    pub const MERGE_NAME_PREFIX_MIN_LEN: usize = 4;

    // hybridSearch coefficients. No explicit term-frequency coefficients are
    // given upstream; these preserve the documented ordering (name match >
    // attribute match > connectivity > recency) without claiming BM25
    // fidelity.
    pub const SCORE_NAME_MATCH: f32 = 1.0;
    pub const SCORE_ATTRIBUTE_MATCH: f32 = 0.6;
    pub const SCORE_CONNECTIVITY_UNIT: f32 = 0.05;
    pub const SCORE_CONNECTIVITY_MAX: f32 = 0.3;
    pub const SCORE_RECENCY_MAX: f32 = 0.2;
    pub const RECENCY_HALF_LIFE_DAYS: f64 = 14.0;
}

/// Conversation memory defaults.
pub mod conversation {
    pub const SUMMARIZATION_THRESHOLD: usize = 15;
    pub const MAX_SUMMARIES_STORED: usize = 100;
    pub const MAX_RETRIEVED_CONTEXT: usize = 5;
    pub const FALLBACK_SUMMARY_TRUNCATE_CHARS: usize = 500;
    pub const FALLBACK_FACT_SAMPLE: usize = 5;
}

/// Active retriever defaults.
pub mod retriever {
    pub const MEMORY_SYSTEM_WEIGHT: f32 = 0.35;
    pub const CONVERSATION_WEIGHT: f32 = 0.30;
    pub const KNOWLEDGE_GRAPH_WEIGHT: f32 = 0.20;
    pub const EVENT_HISTORY_WEIGHT: f32 = 0.15;

    pub const MAX_MEMORY_SYSTEM_RESULTS: usize = 10;
    pub const MAX_EPISODIC_RESULTS: usize = 5;
    pub const MAX_SEMANTIC_RESULTS: usize = 5;
    pub const MAX_PROCEDURAL_RESULTS: usize = 3;
    pub const MAX_KNOWLEDGE_GRAPH_RESULTS: usize = 5;
    pub const MAX_EVENT_RESULTS: usize = 5;
    pub const MAX_TOTAL_RESULTS: usize = 15;

    pub const MIN_SIMILARITY_THRESHOLD: f32 = 0.3;
    pub const MIN_CONFIDENCE_TO_INJECT: f32 = 0.4;

    pub const DEDUP_PREFIX_CHARS: usize = 100;
    pub const AI_RERANK_MAX_SOURCES_TO_SKIP: usize = 3;
    pub const AI_RERANK_POSITION_DECAY: f32 = 0.1;

    pub const CONVERSATION_PREFERENCE_RELEVANCE: f32 = 0.9;
    pub const EVENT_UNRECOVERABLE_RELEVANCE: f32 = 0.8;
    pub const EVENT_RECOVERABLE_RELEVANCE: f32 = 0.5;
    pub const EVENT_LEARNING_RELEVANCE: f32 = 0.4;
}

/// Augmenter defaults.
pub mod augmenter {
    pub const DEBUG_TASK_CONFIDENCE_THRESHOLD: f32 = 0.3;
    pub const INJECT_ON_FIRST_MESSAGE: bool = false;
    pub const MAX_PROCEDURAL_SUGGESTIONS: usize = 3;
    pub const MAX_FACT_SUGGESTIONS: usize = 2;
    pub const PROCEDURAL_SUGGESTION_MIN_SUCCESS_RATE: f32 = 0.7;
    pub const FACT_SUGGESTION_MIN_CONFIDENCE: f32 = 0.8;
}
