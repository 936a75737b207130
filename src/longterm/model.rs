//! Long-term fact data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SourceKind;

/// A strength-keyed fact in the long-term store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTermFact {
    pub id: Uuid,
    pub content: String,
    pub category: String,
    pub strength: f32,
    pub keywords: Vec<String>,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub last_reinforced_at: Option<DateTime<Utc>>,
    pub reinforcement_count: u32,
}

impl LongTermFact {
    #[must_use]
    pub fn new(
        content: impl Into<String>,
        category: impl Into<String>,
        strength: f32,
        keywords: Vec<String>,
        source: SourceKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            category: category.into(),
            strength: strength.clamp(0.0, 1.0),
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            source,
            created_at: Utc::now(),
            last_reinforced_at: None,
            reinforcement_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fact_clamps_strength_and_lowercases_keywords() {
        let fact = LongTermFact::new("x", "cat", 1.4, vec!["Coffee".into()], SourceKind::Explicit);
        assert_eq!(fact.strength, 1.0);
        assert_eq!(fact.keywords, vec!["coffee"]);
    }
}
