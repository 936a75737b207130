//! Conversation memory data model: facts, summaries, and the user
//! preference map.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SourceKind;

/// The category a catalogued fact belongs to, derived from which
/// extraction pattern matched it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FactCategory {
    UserInfo,
    UserPreference,
    TechnicalContext,
    ProjectDetails,
    DomainKnowledge,
}

/// A single extracted or learned fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub category: FactCategory,
    pub text: String,
    pub source: SourceKind,
    pub confidence: f32,
    pub last_referenced_at: Option<DateTime<Utc>>,
}

impl Fact {
    #[must_use]
    pub fn new(category: FactCategory, text: impl Into<String>, source: SourceKind, confidence: f32) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            category,
            text: text.into(),
            source,
            confidence: confidence.clamp(0.0, 1.0),
            last_referenced_at: None,
        }
    }
}

/// A rolled-up summary of a stretch of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub project_id: Option<String>,
    pub text: String,
    pub key_topics: Vec<String>,
    pub message_count: usize,
    pub importance: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fact_clamps_confidence() {
        let f = Fact::new(FactCategory::UserInfo, "likes rust", SourceKind::Inferred, 2.0);
        assert_eq!(f.confidence, 1.0);
    }
}
