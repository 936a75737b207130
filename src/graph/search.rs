//! Hybrid text/connectivity/recency search and BFS path-finding over the
//! graph's undirected projection.
//!
//! `hybridSearch`'s term-frequency coefficients are not specified upstream;
//! the constants in `constants::graph` fix an ordering (name match >
//! attribute match > connectivity > recency) and are documented there
//! rather than guessed at per call site.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;

use crate::constants::graph as cfg;
use crate::graph::model::{Edge, Entity};

/// How a `hybridSearch` hit matched the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Name,
    Attribute,
    Connectivity,
}

/// A single ranked hit from `hybridSearch`.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub entity: Entity,
    pub score: f32,
    pub match_type: MatchType,
}

/// BM25-flavored text match combined with a connectivity/recency boost.
/// Higher name match beats attribute match beats connectivity beats
/// recency, per the documented ordering.
#[must_use]
pub fn hybrid_search(entities: &[Entity], edges: &[Edge], query: &str, limit: usize) -> Vec<SearchHit> {
    let query_lower = query.to_lowercase();
    if query_lower.trim().is_empty() {
        return Vec::new();
    }

    let connectivity: HashMap<&str, usize> = {
        let mut counts = HashMap::new();
        for edge in edges {
            *counts.entry(edge.source_id.as_str()).or_insert(0) += 1;
            *counts.entry(edge.target_id.as_str()).or_insert(0) += 1;
        }
        counts
    };

    let mut hits: Vec<SearchHit> = Vec::new();
    for entity in entities {
        let name_match = entity.name.to_lowercase().contains(&query_lower);
        let attribute_match = entity
            .attributes
            .values()
            .any(|v| v.to_lowercase().contains(&query_lower));

        if !name_match && !attribute_match {
            continue;
        }

        let match_type = if name_match { MatchType::Name } else { MatchType::Attribute };
        let base = if name_match { cfg::SCORE_NAME_MATCH } else { cfg::SCORE_ATTRIBUTE_MATCH };

        let degree = connectivity.get(entity.id.as_str()).copied().unwrap_or(0) as f32;
        let connectivity_boost = (degree * cfg::SCORE_CONNECTIVITY_UNIT).min(cfg::SCORE_CONNECTIVITY_MAX);

        let days_since_update = (Utc::now() - entity.last_updated_at).num_seconds() as f64 / 86_400.0;
        let recency_boost = cfg::SCORE_RECENCY_MAX as f64 * 0.5_f64.powf(days_since_update.max(0.0) / cfg::RECENCY_HALF_LIFE_DAYS);

        hits.push(SearchHit {
            entity: entity.clone(),
            score: base + connectivity_boost + recency_boost as f32,
            match_type,
        });
    }

    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit);
    hits
}

/// BFS over the undirected projection of `edges`, capped at
/// `BFS_MAX_DEPTH`. Returns the first edge-path found from `source` to
/// `target`, if any.
#[must_use]
pub fn find_connection(edges: &[Edge], source: &str, target: &str) -> Option<Vec<Edge>> {
    if source == target {
        return None;
    }

    let mut adjacency: HashMap<&str, Vec<&Edge>> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.source_id.as_str()).or_default().push(edge);
        adjacency.entry(edge.target_id.as_str()).or_default().push(edge);
    }

    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(source);
    let mut queue: VecDeque<(&str, Vec<Edge>)> = VecDeque::new();
    queue.push_back((source, Vec::new()));

    while let Some((node, path)) = queue.pop_front() {
        if path.len() >= cfg::BFS_MAX_DEPTH {
            continue;
        }
        let Some(neighbors) = adjacency.get(node) else { continue };
        for edge in neighbors {
            let next = if edge.source_id == node { edge.target_id.as_str() } else { edge.source_id.as_str() };
            if visited.contains(next) {
                continue;
            }
            let mut next_path = path.clone();
            next_path.push((*edge).clone());
            if next == target {
                return Some(next_path);
            }
            visited.insert(next);
            queue.push_back((next, next_path));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::EntityType;

    fn entity(id_name: &str, entity_type: EntityType) -> Entity {
        Entity::new(entity_type, id_name)
    }

    fn edge(a: &Entity, b: &Entity, rel: &str) -> Edge {
        let now = Utc::now();
        Edge {
            source_id: a.id.clone(),
            target_id: b.id.clone(),
            relationship: rel.into(),
            confidence: 1.0,
            created_at: now,
            last_referenced_at: now,
        }
    }

    #[test]
    fn scenario_s3_graph_path() {
        let alice = entity("alice", EntityType::Person);
        let atlas = entity("atlas", EntityType::Project);
        let scheduling = entity("scheduling", EntityType::Topic);
        let edges = vec![
            edge(&alice, &atlas, "works_on"),
            edge(&atlas, &scheduling, "about"),
        ];
        let path = find_connection(&edges, &alice.id, &scheduling.id).unwrap();
        assert_eq!(path.len(), 2);
        assert_eq!(path[0].relationship, "works_on");
        assert_eq!(path[1].relationship, "about");
    }

    #[test]
    fn no_path_beyond_max_depth_returns_none() {
        // A chain of 6 entities exceeds BFS_MAX_DEPTH (4).
        let chain: Vec<Entity> = (0..6).map(|i| entity(&format!("n{i}"), EntityType::Topic)).collect();
        let edges: Vec<Edge> = chain.windows(2).map(|w| edge(&w[0], &w[1], "next")).collect();
        assert!(find_connection(&edges, &chain[0].id, &chain[5].id).is_none());
    }

    #[test]
    fn hybrid_search_ranks_name_match_above_attribute_match() {
        let mut a = entity("rust programming", EntityType::Skill);
        let mut b = entity("unrelated", EntityType::Skill);
        b.attributes.insert("note".into(), "rust programming enthusiast".into());
        let hits = hybrid_search(&[a.clone(), b.clone()], &[], "rust programming", 10);
        assert_eq!(hits[0].entity.id, a.id);
        assert_eq!(hits[0].match_type, MatchType::Name);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let a = entity("alice", EntityType::Person);
        assert!(hybrid_search(&[a], &[], "   ", 10).is_empty());
    }
}
