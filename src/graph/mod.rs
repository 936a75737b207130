//! The knowledge graph: typed entities, bidirectional adjacency, BFS
//! path queries, deduplication/merge, staleness decay, and hybrid search.

pub mod model;
pub mod search;

pub use model::{Edge, Entity, EntityType};
pub use search::{MatchType, SearchHit};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::constants::graph as cfg;
use crate::error::{Error, Result};
use crate::persist;

#[derive(Serialize, Deserialize, Default, Clone)]
struct Snapshot {
    entities: Vec<Entity>,
    edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub entities: usize,
    pub edges: usize,
}

/// The outcome of a `query(text)` call: matched entities, optionally joined
/// by a connection path when at least two were found.
#[derive(Debug, Clone)]
pub struct GraphQueryResult {
    pub matched_entities: Vec<Entity>,
    pub related_edges: Vec<Edge>,
    pub connection: Option<Vec<Edge>>,
}

/// The graph store. A dirty flag gates writes so repeated read-only calls
/// don't re-persist an unchanged snapshot.
pub struct GraphStore {
    entities: Arc<RwLock<HashMap<String, Entity>>>,
    edges: Arc<RwLock<Vec<Edge>>>,
    dirty: Arc<RwLock<bool>>,
    path: PathBuf,
}

impl GraphStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        let snapshot: Snapshot = persist::load_json(&path).unwrap_or_default();
        let entities = snapshot.entities.into_iter().map(|e| (e.id.clone(), e)).collect();
        debug!("knowledge graph loaded");
        Self {
            entities: Arc::new(RwLock::new(entities)),
            edges: Arc::new(RwLock::new(snapshot.edges)),
            dirty: Arc::new(RwLock::new(false)),
            path,
        }
    }

    async fn mark_dirty(&self) {
        *self.dirty.write().await = true;
    }

    /// Persist `{entities[], edges[]}` if the dirty flag is set.
    pub async fn persist_if_dirty(&self) {
        let mut dirty = self.dirty.write().await;
        if !*dirty {
            return;
        }
        let entities: Vec<Entity> = self.entities.read().await.values().cloned().collect();
        let edges = self.edges.read().await.clone();
        persist::save_json(&self.path, &Snapshot { entities, edges });
        *dirty = false;
    }

    /// Upsert by id.
    #[instrument(skip(self, entity))]
    pub async fn add_entity(&self, entity: Entity) -> String {
        let id = entity.id.clone();
        self.entities.write().await.insert(id.clone(), entity);
        self.mark_dirty().await;
        self.persist_if_dirty().await;
        id
    }

    fn is_similar(a: &Entity, incoming_name: &str, incoming_type: EntityType) -> bool {
        if a.entity_type != incoming_type {
            return false;
        }
        let a_lower = a.name.to_lowercase();
        let b_lower = incoming_name.to_lowercase();
        if a_lower == b_lower {
            return true;
        }
        let min_len = cfg::MERGE_NAME_PREFIX_MIN_LEN;
        (a_lower.len() >= min_len && b_lower.starts_with(&a_lower))
            || (b_lower.len() >= min_len && a_lower.starts_with(&b_lower))
    }

    /// Merge into an existing similar entity (same type, case-insensitive
    /// name match or a ≥4-char prefix relationship) or insert new.
    #[instrument(skip(self, incoming))]
    pub async fn add_or_merge_entity(&self, incoming: Entity) -> String {
        let mut entities = self.entities.write().await;
        let existing_id = entities
            .values()
            .find(|e| Self::is_similar(e, &incoming.name, incoming.entity_type))
            .map(|e| e.id.clone());

        let id = if let Some(existing_id) = existing_id {
            let existing = entities.get_mut(&existing_id).expect("existing_id was just found in the map");
            existing.last_updated_at = Utc::now();
            existing.reference_count += 1;
            for (k, v) in incoming.attributes {
                existing.attributes.insert(k, v); // new values win
            }
            existing_id
        } else {
            let id = incoming.id.clone();
            entities.insert(id.clone(), incoming);
            id
        };
        drop(entities);
        self.mark_dirty().await;
        self.persist_if_dirty().await;
        id
    }

    /// Add an edge if both endpoints exist and no exact duplicate
    /// `(source, target, relationship)` is already present.
    #[instrument(skip(self, relationship))]
    pub async fn add_relationship(&self, source_id: &str, target_id: &str, relationship: impl Into<String>, confidence: f32) -> Result<()> {
        let relationship = relationship.into();
        let entities = self.entities.read().await;
        if !entities.contains_key(source_id) {
            return Err(Error::EntityNotFound(source_id.to_string()));
        }
        if !entities.contains_key(target_id) {
            return Err(Error::EntityNotFound(target_id.to_string()));
        }
        drop(entities);

        let mut edges = self.edges.write().await;
        let duplicate = edges
            .iter()
            .any(|e| e.source_id == source_id && e.target_id == target_id && e.relationship == relationship);
        if duplicate {
            return Ok(()); // refuse exact duplicate, no-op per G2
        }
        let now = Utc::now();
        edges.push(Edge {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            relationship,
            confidence: confidence.clamp(0.0, 1.0),
            created_at: now,
            last_referenced_at: now,
        });
        drop(edges);
        self.mark_dirty().await;
        self.persist_if_dirty().await;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn find_connection(&self, source_id: &str, target_id: &str) -> Option<Vec<Edge>> {
        let edges = self.edges.read().await;
        search::find_connection(&edges, source_id, target_id)
    }

    #[instrument(skip(self, query))]
    pub async fn hybrid_search(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let entities: Vec<Entity> = self.entities.read().await.values().cloned().collect();
        let edges = self.edges.read().await.clone();
        search::hybrid_search(&entities, &edges, query, limit)
    }

    /// Remove entities last updated before `days` ago with fewer than
    /// `min_ref` references, along with their incident edges.
    #[instrument(skip(self))]
    pub async fn decay_stale_entities(&self, days: i64, min_ref: u32) {
        let cutoff = Utc::now() - chrono::Duration::days(days);
        let mut entities = self.entities.write().await;
        let stale_ids: Vec<String> = entities
            .values()
            .filter(|e| e.last_updated_at < cutoff && e.reference_count < min_ref)
            .map(|e| e.id.clone())
            .collect();
        for id in &stale_ids {
            entities.remove(id);
        }
        drop(entities);

        if !stale_ids.is_empty() {
            let mut edges = self.edges.write().await;
            edges.retain(|e| !stale_ids.contains(&e.source_id) && !stale_ids.contains(&e.target_id));
            drop(edges);
            self.mark_dirty().await;
            self.persist_if_dirty().await;
            debug!(removed = stale_ids.len(), "decayed stale entities");
        }
    }

    /// Match entities mentioned in free text; if two or more match, attempt
    /// `find_connection` between the first two, else return the matches and
    /// their incident edges.
    #[instrument(skip(self, text))]
    pub async fn query(&self, text: &str) -> GraphQueryResult {
        let lower = text.to_lowercase();
        let entities = self.entities.read().await;
        let matched: Vec<Entity> = entities
            .values()
            .filter(|e| lower.contains(&e.name.to_lowercase()))
            .cloned()
            .collect();
        drop(entities);

        if matched.len() >= 2 {
            let connection = self.find_connection(&matched[0].id, &matched[1].id).await;
            return GraphQueryResult { matched_entities: matched, related_edges: Vec::new(), connection };
        }

        let edges = self.edges.read().await;
        let matched_ids: Vec<&str> = matched.iter().map(|e| e.id.as_str()).collect();
        let related_edges: Vec<Edge> = edges
            .iter()
            .filter(|e| matched_ids.contains(&e.source_id.as_str()) || matched_ids.contains(&e.target_id.as_str()))
            .cloned()
            .collect();
        GraphQueryResult { matched_entities: matched, related_edges, connection: None }
    }

    /// All entities, for callers that need to fall back to a linear scan
    /// (e.g. the retriever's token-overlap/reference-count fallback when
    /// `hybridSearch` finds nothing).
    pub async fn all_entities(&self) -> Vec<Entity> {
        self.entities.read().await.values().cloned().collect()
    }

    pub async fn stats(&self) -> GraphStats {
        GraphStats {
            entities: self.entities.read().await.len(),
            edges: self.edges.read().await.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fresh_store() -> GraphStore {
        let dir = tempfile::tempdir().unwrap();
        GraphStore::new(dir.path().join("KnowledgeGraph").join("graph.json"))
    }

    #[tokio::test]
    async fn add_relationship_requires_both_endpoints() {
        let store = fresh_store().await;
        let alice = store.add_entity(Entity::new(EntityType::Person, "Alice")).await;
        let err = store.add_relationship(&alice, "project:missing", "works_on", 1.0).await.unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn duplicate_edge_is_refused_silently() {
        let store = fresh_store().await;
        let alice = store.add_entity(Entity::new(EntityType::Person, "Alice")).await;
        let atlas = store.add_entity(Entity::new(EntityType::Project, "Atlas")).await;
        store.add_relationship(&alice, &atlas, "works_on", 1.0).await.unwrap();
        store.add_relationship(&alice, &atlas, "works_on", 1.0).await.unwrap();
        assert_eq!(store.stats().await.edges, 1);
    }

    #[tokio::test]
    async fn merge_unions_attributes_and_bumps_reference_count() {
        let store = fresh_store().await;
        let mut first = Entity::new(EntityType::Habit, "Morning Run");
        first.attributes.insert("frequency".into(), "daily".into());
        store.add_or_merge_entity(first).await;

        let mut second = Entity::new(EntityType::Habit, "morning run");
        second.attributes.insert("duration".into(), "30min".into());
        let id = store.add_or_merge_entity(second).await;

        let entities = store.entities.read().await;
        let merged = entities.get(&id).unwrap();
        assert_eq!(merged.reference_count, 2);
        assert_eq!(merged.attributes.get("frequency").unwrap(), "daily");
        assert_eq!(merged.attributes.get("duration").unwrap(), "30min");
    }

    #[tokio::test]
    async fn decay_stale_entities_drops_incident_edges() {
        let store = fresh_store().await;
        let mut stale = Entity::new(EntityType::Topic, "old topic");
        stale.last_updated_at = Utc::now() - chrono::Duration::days(200);
        stale.reference_count = 1;
        let stale_id = store.add_entity(stale).await;
        let anchor = store.add_entity(Entity::new(EntityType::Topic, "anchor")).await;
        store.add_relationship(&stale_id, &anchor, "related_to", 1.0).await.unwrap();

        store.decay_stale_entities(90, 2).await;
        assert_eq!(store.stats().await.entities, 1);
        assert_eq!(store.stats().await.edges, 0);
    }

    #[tokio::test]
    async fn round_trip_persistence_reproduces_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        let alice_id;
        {
            let store = GraphStore::new(path.clone());
            alice_id = store.add_entity(Entity::new(EntityType::Person, "Alice")).await;
        }
        let reloaded = GraphStore::new(path);
        assert_eq!(reloaded.stats().await.entities, 1);
        assert!(reloaded.entities.read().await.contains_key(&alice_id));
    }
}
