//! The record store: file-persisted records of four kinds, an LRU hot
//! cache, importance scoring, time decay, hash-embedding semantic search
//! and pattern detection.
//!
//! The store is a single-writer isolation domain: every mutation and read
//! passes through one `tokio::sync::RwLock` — callers may issue concurrent
//! requests, but they serialize inside the store.

pub mod cache;
pub mod embedding;
pub mod importance;
pub mod model;
pub mod pattern;

pub use model::{Pattern, ProspectiveState, Record, RecordKind, RecordMetadata};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::constants::record_store as cfg;
use crate::error::{Error, Result};
use crate::persist;
use crate::textutil;
use crate::types::{ContextSnapshot, SourceKind, Trigger};
use embedding::Embedding;

/// Tunables for the record store, sourced from `constants::record_store`.
#[derive(Debug, Clone)]
pub struct RecordStoreConfig {
    pub enable_time_decay: bool,
    pub decay_half_life_days: f64,
    pub minimum_confidence_for_retention: f32,
    pub enable_semantic_search: bool,
    pub embedding_dim: usize,
    pub max_cache_size: usize,
}

impl Default for RecordStoreConfig {
    fn default() -> Self {
        Self {
            enable_time_decay: cfg::ENABLE_TIME_DECAY,
            decay_half_life_days: cfg::DECAY_HALF_LIFE_DAYS,
            minimum_confidence_for_retention: cfg::MINIMUM_CONFIDENCE_FOR_RETENTION,
            enable_semantic_search: cfg::ENABLE_SEMANTIC_SEARCH,
            embedding_dim: cfg::EMBEDDING_DIM,
            max_cache_size: cfg::MAX_CACHE_SIZE,
        }
    }
}

/// Read-only snapshot of the store's health, in place of exposing mutable
/// state for UI binding.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RecordStoreStats {
    pub total: usize,
    pub by_kind: HashMap<String, usize>,
    pub average_confidence: f32,
    pub cache_size: usize,
    pub embedding_count: usize,
}

#[derive(Serialize, Deserialize, Default)]
struct Snapshot {
    records: Vec<Record>,
}

/// The record store.
pub struct RecordStore {
    records: Arc<RwLock<Vec<Record>>>,
    embeddings: Arc<RwLock<HashMap<Uuid, Embedding>>>,
    cache: Arc<cache::RecordCache>,
    config: RecordStoreConfig,
    path: PathBuf,
    stop: Arc<AtomicBool>,
}

impl RecordStore {
    /// Construct a store rooted at `path`, loading any existing snapshot.
    /// A decode failure on load yields an empty store, per the failure
    /// semantics in the error handling design.
    #[must_use]
    pub fn new(path: PathBuf, config: RecordStoreConfig) -> Self {
        let snapshot: Snapshot = persist::load_json(&path).unwrap_or_default();
        let cache = cache::RecordCache::new(config.max_cache_size);
        let mut embeddings = HashMap::new();

        for record in &snapshot.records {
            cache.put(record.key.clone(), record.id);
            if config.enable_semantic_search {
                embeddings.insert(record.id, embedding::embed(&record.searchable_text()));
            }
        }

        info!(count = snapshot.records.len(), "record store loaded");

        Self {
            records: Arc::new(RwLock::new(snapshot.records)),
            embeddings: Arc::new(RwLock::new(embeddings)),
            cache: Arc::new(cache),
            config,
            path,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn persist(&self) {
        let records = self.records.read().await;
        persist::save_json(&self.path, &Snapshot { records: records.clone() });
    }

    /// Append `record`, cache it by key, optionally embed it, enforce the
    /// cache's capacity, and persist.
    #[instrument(skip(self, record), fields(kind = ?record.kind, key = %record.key))]
    pub async fn store(&self, mut record: Record) -> Uuid {
        record.clamp_confidence();
        let id = record.id;
        let key = record.key.clone();

        if self.config.enable_semantic_search {
            let vector = embedding::embed(&record.searchable_text());
            self.embeddings.write().await.insert(id, vector);
        }

        {
            let mut records = self.records.write().await;
            records.push(record);
        }

        if let Some(evicted) = self.cache.put(key, id) {
            debug!(?evicted, "record cache evicted entry on insert");
        }
        self.enforce_cache_capacity().await;
        self.persist().await;
        id
    }

    async fn enforce_cache_capacity(&self) {
        let evicted = self.cache.evict_to_capacity(self.config.max_cache_size);
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "record cache trimmed to capacity");
        }
    }

    /// Filter by kind/category/time range, sort by `created_at` descending,
    /// take `limit`.
    #[instrument(skip(self))]
    pub async fn retrieve(
        &self,
        kind: RecordKind,
        category: Option<&str>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Vec<Record> {
        let records = self.records.read().await;
        let mut matches: Vec<Record> = records
            .iter()
            .filter(|r| r.kind == kind)
            .filter(|r| category.is_none_or(|c| r.category == c))
            .filter(|r| start.is_none_or(|s| r.created_at >= s))
            .filter(|r| end.is_none_or(|e| r.created_at <= e))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches.truncate(limit);
        matches
    }

    /// Cosine-similarity search over the embedding index.
    #[instrument(skip(self, query))]
    pub async fn semantic_search(&self, query: &str, limit: usize) -> Vec<(Record, f32)> {
        if !self.config.enable_semantic_search {
            return Vec::new();
        }
        let query_vec = embedding::embed(query);
        let records = self.records.read().await;
        let embeddings = self.embeddings.read().await;

        let mut scored: Vec<(Record, f32)> = records
            .iter()
            .filter_map(|r| {
                embeddings
                    .get(&r.id)
                    .map(|v| (r.clone(), embedding::cosine_similarity(&query_vec, v)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        scored
    }

    /// Substring keyword match over `key + " " + value`, ranked by
    /// importance.
    #[instrument(skip(self, query))]
    pub async fn keyword_search(&self, query: &str, limit: usize) -> Vec<Record> {
        let tokens = textutil::tokenize(query, 2);
        if tokens.is_empty() {
            return Vec::new();
        }
        let records = self.records.read().await;
        let mut matches: Vec<Record> = records
            .iter()
            .filter(|r| textutil::contains_any_token(&r.searchable_text(), &tokens))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            importance::importance(b)
                .partial_cmp(&importance::importance(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(limit);
        matches
    }

    /// Apply the diminishing-returns reinforcement bump on recall.
    #[instrument(skip(self))]
    pub async fn strengthen_memory(&self, id: Uuid) -> Result<()> {
        let mut records = self.records.write().await;
        let record = records.iter_mut().find(|r| r.id == id).ok_or(Error::NotFound(id))?;
        let delta = 0.1 * 0.9_f32.powi(record.access_count as i32);
        record.confidence = (record.confidence + delta).min(1.0);
        record.access_count += 1;
        record.last_accessed = Utc::now();
        record.clamp_confidence();
        Ok(())
    }

    /// Exponentially decay the confidence of records idle for more than a
    /// day, never below `minimum_confidence_for_retention`.
    #[instrument(skip(self))]
    pub async fn apply_time_decay(&self) {
        if !self.config.enable_time_decay {
            return;
        }
        let now = Utc::now();
        let mut records = self.records.write().await;
        let mut touched = 0usize;
        for record in records.iter_mut() {
            let idle_days = (now - record.last_accessed).num_seconds() as f64 / 86_400.0;
            if idle_days <= 1.0 {
                continue;
            }
            let factor = 0.5_f64.powf(idle_days / self.config.decay_half_life_days);
            let decayed = (record.confidence as f64 * factor) as f32;
            record.confidence = decayed.max(self.config.minimum_confidence_for_retention);
            record.clamp_confidence();
            touched += 1;
        }
        drop(records);
        if touched > 0 {
            debug!(touched, "time decay applied");
            self.persist().await;
        }
    }

    /// Prune aged-out semantic records, archive (log-only) old episodic
    /// records, drop already-triggered prospective records, and evict the
    /// cache down to capacity.
    #[instrument(skip(self))]
    pub async fn consolidate(&self) {
        let now = Utc::now();
        let mut removed_ids = Vec::new();

        {
            let mut records = self.records.write().await;
            let mut kept = Vec::with_capacity(records.len());
            for record in records.drain(..) {
                let age_days = (now - record.created_at).num_days();

                let prune_semantic = record.kind == RecordKind::Semantic
                    && age_days > cfg::CONSOLIDATE_SEMANTIC_MAX_AGE_DAYS
                    && record.confidence < cfg::CONSOLIDATE_SEMANTIC_MIN_CONFIDENCE;

                let drop_triggered_prospective = record.kind == RecordKind::Prospective
                    && matches!(
                        record.metadata,
                        RecordMetadata::Prospective { state: ProspectiveState::Triggered, .. }
                    );

                if record.kind == RecordKind::Episodic
                    && age_days > cfg::CONSOLIDATE_EPISODIC_ARCHIVE_AGE_DAYS
                {
                    info!(id = %record.id, age_days, "archiving old episodic record (log-only)");
                }

                if prune_semantic || drop_triggered_prospective {
                    removed_ids.push(record.id);
                } else {
                    kept.push(record);
                }
            }
            *records = kept;
        }

        if !removed_ids.is_empty() {
            let mut embeddings = self.embeddings.write().await;
            for id in &removed_ids {
                embeddings.remove(id);
            }
        }

        let evicted = self.cache.evict_to_capacity(self.config.max_cache_size);
        info!(
            pruned = removed_ids.len(),
            cache_evicted = evicted.len(),
            "consolidation complete"
        );
        self.persist().await;
    }

    /// Store an intention with an unsatisfied trigger.
    #[instrument(skip(self, intention))]
    pub async fn store_prospective(&self, intention: impl Into<String>, trigger: Trigger) -> Uuid {
        let record = Record::new(
            RecordKind::Prospective,
            "intention",
            intention.into(),
            String::new(),
            1.0,
            SourceKind::Explicit,
            RecordMetadata::Prospective { trigger, state: ProspectiveState::Pending },
        );
        self.store(record).await
    }

    /// Scan pending prospective records and transition the satisfied ones
    /// to `Triggered`, returning them.
    #[instrument(skip(self, snapshot))]
    pub async fn check_prospective(&self, snapshot: &ContextSnapshot) -> Vec<Record> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let mut triggered = Vec::new();

        for record in records.iter_mut() {
            if record.kind != RecordKind::Prospective {
                continue;
            }
            let RecordMetadata::Prospective { trigger, state } = &mut record.metadata else {
                continue;
            };
            if *state == ProspectiveState::Pending && trigger.is_satisfied(snapshot, now) {
                *state = ProspectiveState::Triggered; // Pending -> Triggered
                triggered.push(record.clone());
            }
        }
        drop(records);
        if !triggered.is_empty() {
            self.persist().await;
        }
        triggered
    }

    /// Bucket episodic records by `(hour, weekday, key)` and emit patterns
    /// exceeding the occurrence threshold.
    #[instrument(skip(self))]
    pub async fn detect_patterns(&self, window_days: i64, min_occurrences: usize) -> Vec<Pattern> {
        let records = self.records.read().await;
        pattern::detect_patterns(&records, window_days, min_occurrences)
    }

    /// Read-only health snapshot.
    pub async fn stats(&self) -> RecordStoreStats {
        let records = self.records.read().await;
        let mut by_kind = HashMap::new();
        let mut confidence_sum = 0.0f32;
        for record in records.iter() {
            *by_kind.entry(format!("{:?}", record.kind)).or_insert(0) += 1;
            confidence_sum += record.confidence;
        }
        RecordStoreStats {
            total: records.len(),
            average_confidence: if records.is_empty() { 0.0 } else { confidence_sum / records.len() as f32 },
            by_kind,
            cache_size: self.cache.len(),
            embedding_count: self.embeddings.read().await.len(),
        }
    }

    /// Spawn the background loop that calls `apply_time_decay` hourly.
    /// Stops (finishing any in-flight decay pass) once `stop()` is called.
    pub fn spawn_decay_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(cfg::DECAY_LOOP_INTERVAL_SECS);
            loop {
                tokio::time::sleep(interval).await;
                if store.stop.load(Ordering::Relaxed) {
                    break;
                }
                store.apply_time_decay().await;
            }
        })
    }

    /// Signal the background decay loop to stop after its current pass.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn semantic(key: &str, value: &str, confidence: f32) -> Record {
        Record::new(RecordKind::Semantic, "general", key, value, confidence, SourceKind::Explicit, RecordMetadata::None)
    }

    async fn fresh_store() -> RecordStore {
        let dir = tempfile::tempdir().unwrap();
        RecordStore::new(dir.path().join("memories.json"), RecordStoreConfig::default())
    }

    #[tokio::test]
    async fn store_then_retrieve_round_trips() {
        let store = fresh_store().await;
        store.store(semantic("coffee", "loves pour-over", 0.9)).await;
        let results = store.retrieve(RecordKind::Semantic, None, None, None, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "coffee");
    }

    #[tokio::test]
    async fn keyword_search_finds_substring_matches() {
        let store = fresh_store().await;
        store.store(semantic("coffee", "loves pour-over coffee brewing", 0.9)).await;
        store.store(semantic("unrelated", "quarterly tax filing", 0.9)).await;
        let results = store.keyword_search("coffee brewing", 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "coffee");
    }

    #[tokio::test]
    async fn semantic_search_ranks_closer_text_higher() {
        let store = fresh_store().await;
        store.store(semantic("a", "loves pour-over coffee brewing", 0.9)).await;
        store.store(semantic("b", "quarterly tax filing deadline", 0.9)).await;
        let results = store.semantic_search("pour-over coffee", 10).await;
        assert_eq!(results[0].0.key, "a");
    }

    #[tokio::test]
    async fn strengthen_memory_increases_confidence_and_access_count() {
        let store = fresh_store().await;
        let id = store.store(semantic("a", "b", 0.5)).await;
        store.strengthen_memory(id).await.unwrap();
        let results = store.retrieve(RecordKind::Semantic, None, None, None, 10).await;
        assert!(results[0].confidence > 0.5);
        assert_eq!(results[0].access_count, 1);
    }

    #[tokio::test]
    async fn strengthen_unknown_id_is_not_found() {
        let store = fresh_store().await;
        let err = store.strengthen_memory(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn time_decay_never_drops_below_minimum_retention() {
        let store = fresh_store().await;
        let mut r = semantic("a", "b", 0.2);
        r.last_accessed = Utc::now() - chrono::Duration::days(365);
        r.created_at = r.last_accessed;
        store.store(r).await;
        store.apply_time_decay().await;
        let results = store.retrieve(RecordKind::Semantic, None, None, None, 10).await;
        assert!(results[0].confidence >= cfg::MINIMUM_CONFIDENCE_FOR_RETENTION);
    }

    #[tokio::test]
    async fn consolidate_prunes_old_low_confidence_semantic_records() {
        let store = fresh_store().await;
        let mut r = semantic("a", "b", 0.1);
        r.created_at = Utc::now() - chrono::Duration::days(40);
        store.store(r).await;
        store.consolidate().await;
        let results = store.retrieve(RecordKind::Semantic, None, None, None, 10).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn consolidate_removes_triggered_prospective_records() {
        let store = fresh_store().await;
        let id = store
            .store_prospective("buy milk", Trigger::Keyword("milk".into()))
            .await;
        let snapshot = ContextSnapshot { current_query: Some("need milk".into()), ..Default::default() };
        let triggered = store.check_prospective(&snapshot).await;
        assert_eq!(triggered.len(), 1);
        assert_eq!(triggered[0].id, id);

        store.consolidate().await;
        let remaining = store.retrieve(RecordKind::Prospective, None, None, None, 10).await;
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn prospective_triggers_at_most_once() {
        let store = fresh_store().await;
        store
            .store_prospective("buy milk", Trigger::Keyword("milk".into()))
            .await;
        let snapshot = ContextSnapshot { current_query: Some("need milk".into()), ..Default::default() };
        let first = store.check_prospective(&snapshot).await;
        let second = store.check_prospective(&snapshot).await;
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 0); // already Triggered, not re-fired
    }

    #[tokio::test]
    async fn round_trip_persistence_reproduces_record_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memories.json");
        {
            let store = RecordStore::new(path.clone(), RecordStoreConfig::default());
            store.store(semantic("a", "b", 0.5)).await;
        }
        let reloaded = RecordStore::new(path, RecordStoreConfig::default());
        let results = reloaded.retrieve(RecordKind::Semantic, None, None, None, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, "a");
    }
}
