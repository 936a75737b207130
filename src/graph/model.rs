//! Knowledge-graph data model: typed entities and confidence-weighted
//! edges between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::AttributeMap;

/// The entity categories the graph recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityType {
    Person,
    Place,
    Habit,
    Goal,
    HealthMetric,
    Project,
    Event,
    Topic,
    Skill,
    Preference,
}

impl EntityType {
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Place => "place",
            EntityType::Habit => "habit",
            EntityType::Goal => "goal",
            EntityType::HealthMetric => "healthMetric",
            EntityType::Project => "project",
            EntityType::Event => "event",
            EntityType::Topic => "topic",
            EntityType::Skill => "skill",
            EntityType::Preference => "preference",
        }
    }
}

/// A node in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    pub attributes: AttributeMap,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub reference_count: u32,
}

impl Entity {
    /// Derive `"<type>:<slug(name)>"`: lowercased, spaces replaced with
    /// underscores.
    #[must_use]
    pub fn derive_id(entity_type: EntityType, name: &str) -> String {
        let slug = name.trim().to_lowercase().replace(' ', "_");
        format!("{}:{}", entity_type.slug(), slug)
    }

    #[must_use]
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        let name = name.into();
        let id = Self::derive_id(entity_type, &name);
        let now = Utc::now();
        Self {
            id,
            name,
            entity_type,
            attributes: AttributeMap::new(),
            created_at: now,
            last_updated_at: now,
            reference_count: 1,
        }
    }
}

/// A directed, confidence-weighted relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: String,
    pub target_id: String,
    pub relationship: String,
    pub confidence: f32,
    pub created_at: DateTime<Utc>,
    pub last_referenced_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_is_deterministic_and_slugified() {
        let a = Entity::derive_id(EntityType::Person, "Alice Smith");
        assert_eq!(a, "person:alice_smith");
        let b = Entity::derive_id(EntityType::Person, "  Alice Smith  ");
        assert_eq!(a, b);
    }
}
