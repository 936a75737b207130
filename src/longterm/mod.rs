//! The long-term store: strength-keyed facts with exponential decay,
//! reinforcement-on-recall, keyword+category indices, and periodic
//! pruning.

pub mod model;

pub use model::LongTermFact;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::constants::long_term as cfg;
use crate::error::{Error, Result};
use crate::persist;
use crate::textutil;
use crate::types::SourceKind;

#[derive(Debug, Clone)]
pub struct LongTermConfig {
    pub base_decay_rate: f32,
    pub minimum_strength: f32,
    pub reinforcement_factor: f32,
    pub max_reinforcement: f32,
    pub max_memories: usize,
    pub auto_prune_enabled: bool,
}

impl Default for LongTermConfig {
    fn default() -> Self {
        Self {
            base_decay_rate: cfg::BASE_DECAY_RATE,
            minimum_strength: cfg::MINIMUM_STRENGTH,
            reinforcement_factor: cfg::REINFORCEMENT_FACTOR,
            max_reinforcement: cfg::MAX_REINFORCEMENT,
            max_memories: cfg::MAX_MEMORIES,
            auto_prune_enabled: cfg::AUTO_PRUNE_ENABLED,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LongTermStats {
    pub total: usize,
    pub average_strength: f32,
    pub categories: usize,
    pub keywords: usize,
}

#[derive(Serialize, Deserialize, Default, Clone)]
struct Snapshot {
    memories: HashMap<Uuid, LongTermFact>,
    category_index: HashMap<String, HashSet<Uuid>>,
    keyword_index: HashMap<String, HashSet<Uuid>>,
    last_decay_time: Option<DateTime<Utc>>,
}

/// The long-term store.
pub struct LongTermStore {
    state: Arc<RwLock<Snapshot>>,
    config: LongTermConfig,
    path: PathBuf,
    stop: Arc<AtomicBool>,
}

impl LongTermStore {
    #[must_use]
    pub fn new(path: PathBuf, config: LongTermConfig) -> Self {
        let snapshot: Snapshot = persist::load_json(&path).unwrap_or_default();
        info!(count = snapshot.memories.len(), "long-term store loaded");
        Self {
            state: Arc::new(RwLock::new(snapshot)),
            config,
            path,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn persist(&self) {
        let snapshot = self.state.read().await.clone();
        persist::save_json(&self.path, &snapshot);
    }

    fn index_insert(snapshot: &mut Snapshot, fact: &LongTermFact) {
        snapshot
            .category_index
            .entry(fact.category.clone())
            .or_default()
            .insert(fact.id);
        for keyword in &fact.keywords {
            snapshot.keyword_index.entry(keyword.clone()).or_default().insert(fact.id);
        }
    }

    fn index_remove(snapshot: &mut Snapshot, fact: &LongTermFact) {
        if let Some(set) = snapshot.category_index.get_mut(&fact.category) {
            set.remove(&fact.id);
            if set.is_empty() {
                snapshot.category_index.remove(&fact.category);
            }
        }
        for keyword in &fact.keywords {
            if let Some(set) = snapshot.keyword_index.get_mut(keyword) {
                set.remove(&fact.id);
                if set.is_empty() {
                    snapshot.keyword_index.remove(keyword);
                }
            }
        }
    }

    /// Insert a new fact, index it, and evict the weakest facts if over
    /// `max_memories`.
    #[instrument(skip(self, content, category, keywords))]
    pub async fn store_fact(
        &self,
        content: impl Into<String>,
        category: impl Into<String>,
        initial_strength: f32,
        keywords: Vec<String>,
        source: SourceKind,
    ) -> Uuid {
        let fact = LongTermFact::new(content, category, initial_strength, keywords, source);
        let id = fact.id;

        let mut snapshot = self.state.write().await;
        Self::index_insert(&mut snapshot, &fact);
        snapshot.memories.insert(id, fact);
        Self::evict_weakest_over_capacity(&mut snapshot, self.config.max_memories);
        drop(snapshot);
        self.persist().await;
        id
    }

    fn evict_weakest_over_capacity(snapshot: &mut Snapshot, max_memories: usize) {
        while snapshot.memories.len() > max_memories {
            let weakest_id = snapshot
                .memories
                .values()
                .min_by(|a, b| a.strength.partial_cmp(&b.strength).unwrap_or(std::cmp::Ordering::Equal))
                .map(|f| f.id);
            let Some(weakest_id) = weakest_id else { break };
            if let Some(fact) = snapshot.memories.remove(&weakest_id) {
                Self::index_remove(snapshot, &fact);
            }
        }
    }

    /// Diminishing-returns reinforcement: `boost = min(maxReinforcement,
    /// reinforcementFactor * (1 - strength))`.
    #[instrument(skip(self))]
    pub async fn reinforce(&self, id: Uuid) -> Result<()> {
        let mut snapshot = self.state.write().await;
        let fact = snapshot.memories.get_mut(&id).ok_or(Error::NotFound(id))?;
        let boost = (self.config.reinforcement_factor * (1.0 - fact.strength)).min(self.config.max_reinforcement);
        fact.strength = (fact.strength + boost).min(1.0).clamp(0.0, 1.0);
        fact.last_reinforced_at = Some(Utc::now());
        fact.reinforcement_count += 1; // monotone non-decreasing
        drop(snapshot);
        self.persist().await;
        Ok(())
    }

    /// Decay every fact by its idle time, pruning those below
    /// `minimum_strength` when auto-prune is enabled.
    #[instrument(skip(self))]
    pub async fn decay_unused_facts(&self) {
        let now = Utc::now();
        let mut snapshot = self.state.write().await;
        let mut to_prune = Vec::new();

        for fact in snapshot.memories.values_mut() {
            let since = fact.last_reinforced_at.unwrap_or(fact.created_at);
            let days_idle = (now - since).num_seconds() as f32 / 86_400.0;
            let delta = self.config.base_decay_rate * days_idle.max(0.0) * (1.0 - fact.strength);
            fact.strength = (fact.strength - delta).max(0.0);

            if self.config.auto_prune_enabled && fact.strength < self.config.minimum_strength {
                to_prune.push(fact.id);
            }
        }

        for id in &to_prune {
            if let Some(fact) = snapshot.memories.remove(id) {
                Self::index_remove(&mut snapshot, &fact);
            }
        }
        snapshot.last_decay_time = Some(now);
        let pruned = to_prune.len();
        drop(snapshot);
        if pruned > 0 {
            info!(pruned, "long-term decay pruned weak facts");
        }
        self.persist().await;
    }

    /// Union of the keyword index and a linear content-contains pass,
    /// filtered by `min_strength`, sorted by strength descending.
    #[instrument(skip(self, keywords))]
    pub async fn search(&self, keywords: &[String], min_strength: f32, limit: usize) -> Vec<LongTermFact> {
        let snapshot = self.state.read().await;
        let mut matched: HashSet<Uuid> = HashSet::new();

        for keyword in keywords {
            if let Some(ids) = snapshot.keyword_index.get(&keyword.to_lowercase()) {
                matched.extend(ids);
            }
        }
        for fact in snapshot.memories.values() {
            if textutil::contains_any_token(&fact.content, keywords) {
                matched.insert(fact.id);
            }
        }

        let mut results: Vec<LongTermFact> = matched
            .into_iter()
            .filter_map(|id| snapshot.memories.get(&id).cloned())
            .filter(|f| f.strength >= min_strength)
            .collect();
        results.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        results
    }

    /// All facts at or above `min_strength`, optionally filtered by
    /// category, sorted by strength descending.
    #[instrument(skip(self))]
    pub async fn get_active_memories(&self, min_strength: f32, category: Option<&str>, limit: Option<usize>) -> Vec<LongTermFact> {
        let snapshot = self.state.read().await;
        let mut results: Vec<LongTermFact> = snapshot
            .memories
            .values()
            .filter(|f| f.strength >= min_strength)
            .filter(|f| category.is_none_or(|c| f.category == c))
            .cloned()
            .collect();
        results.sort_by(|a, b| b.strength.partial_cmp(&a.strength).unwrap_or(std::cmp::Ordering::Equal));
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        results
    }

    pub async fn stats(&self) -> LongTermStats {
        let snapshot = self.state.read().await;
        let total = snapshot.memories.len();
        let sum: f32 = snapshot.memories.values().map(|f| f.strength).sum();
        LongTermStats {
            total,
            average_strength: if total == 0 { 0.0 } else { sum / total as f32 },
            categories: snapshot.category_index.len(),
            keywords: snapshot.keyword_index.len(),
        }
    }

    /// Verify the category/keyword indices agree with the fact map in both
    /// directions. Exposed for tests and diagnostics, not part of the
    /// steady-state hot path.
    #[must_use]
    pub async fn indices_consistent(&self) -> bool {
        let snapshot = self.state.read().await;
        for (category, ids) in &snapshot.category_index {
            for id in ids {
                match snapshot.memories.get(id) {
                    Some(fact) if &fact.category == category => {}
                    _ => return false,
                }
            }
        }
        for (keyword, ids) in &snapshot.keyword_index {
            for id in ids {
                match snapshot.memories.get(id) {
                    Some(fact) if fact.keywords.contains(keyword) => {}
                    _ => return false,
                }
            }
        }
        true
    }

    pub fn spawn_decay_loop(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let interval = std::time::Duration::from_secs(cfg::DECAY_INTERVAL_SECS);
            loop {
                tokio::time::sleep(interval).await;
                if store.stop.load(Ordering::Relaxed) {
                    break;
                }
                store.decay_unused_facts().await;
            }
        })
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
