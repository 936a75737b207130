//! The record data model: four record kinds sharing one envelope, with a
//! tagged-variant metadata payload in place of an untyped bag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::SourceKind;

/// The four kinds of record the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Semantic,
    Episodic,
    Procedural,
    Prospective,
}

/// Lifecycle state of a prospective record. `Pending` and `Triggered` are
/// observable; `Removed` records are deleted outright during consolidation
/// rather than retained with a tombstone state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProspectiveState {
    Pending,
    Triggered,
}

/// Kind-specific metadata, replacing an untyped `metadata: bytes?` bag with
/// a variant validated at the type boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordMetadata {
    Episodic {
        outcome: Option<String>,
        emotional_valence: f32,
    },
    Procedural {
        success_rate: f32,
        average_duration_secs: f64,
        execution_count: u32,
    },
    Prospective {
        trigger: crate::types::Trigger,
        state: ProspectiveState,
    },
    None,
}

/// A single stored memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub kind: RecordKind,
    pub category: String,
    pub key: String,
    pub value: String,
    pub confidence: f32,
    pub source: SourceKind,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
    pub metadata: RecordMetadata,
}

impl Record {
    #[must_use]
    pub fn new(
        kind: RecordKind,
        category: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        confidence: f32,
        source: SourceKind,
        metadata: RecordMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            category: category.into(),
            key: key.into(),
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            created_at: now,
            last_accessed: now,
            access_count: 0,
            metadata,
        }
    }

    /// Text searched by keyword matching: `key + " " + value`.
    #[must_use]
    pub fn searchable_text(&self) -> String {
        format!("{} {}", self.key, self.value)
    }

    /// Clamp `confidence` back into `[0.0, 1.0]` after any mutation.
    pub fn clamp_confidence(&mut self) {
        self.confidence = self.confidence.clamp(0.0, 1.0);
    }
}

/// A detected recurring `(hour, weekday, event)` triple, returned by
/// `detectPatterns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub event: String,
    pub frequency: usize,
    pub hour: u32,
    pub weekday: u32,
    pub confidence: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_clamps_confidence() {
        let r = Record::new(
            RecordKind::Semantic,
            "cat",
            "key",
            "val",
            1.5,
            SourceKind::Explicit,
            RecordMetadata::None,
        );
        assert_eq!(r.confidence, 1.0);
    }

    #[test]
    fn last_accessed_initialized_to_created_at() {
        let r = Record::new(
            RecordKind::Episodic,
            "cat",
            "key",
            "val",
            0.5,
            SourceKind::System,
            RecordMetadata::None,
        );
        assert_eq!(r.created_at, r.last_accessed);
    }
}
