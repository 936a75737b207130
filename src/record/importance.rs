//! The importance scoring function used to rank records for cache eviction
//! and keyword-search ordering.

use chrono::Utc;

use crate::constants::record_store as cfg;
use crate::record::model::{Record, RecordKind};

/// Combine recency, access frequency, confidence, source weight and a
/// per-kind bonus into a single `[0, 1]` score.
#[must_use]
pub fn importance(record: &Record) -> f32 {
    let days_since_access = (Utc::now() - record.last_accessed).num_seconds() as f32 / 86_400.0;
    let recency = (-days_since_access.max(0.0) / 30.0).exp();
    let frequency = (record.access_count as f32 / 20.0).min(1.0);

    let type_bonus = match record.kind {
        RecordKind::Procedural => cfg::TYPE_BONUS_PROCEDURAL,
        RecordKind::Prospective => cfg::TYPE_BONUS_PROSPECTIVE,
        RecordKind::Semantic => cfg::TYPE_BONUS_SEMANTIC,
        RecordKind::Episodic => cfg::TYPE_BONUS_EPISODIC,
    };

    let score = cfg::WEIGHT_RECENCY * recency
        + cfg::WEIGHT_FREQUENCY * frequency
        + cfg::WEIGHT_CONFIDENCE * record.confidence
        + cfg::WEIGHT_SOURCE * record.source.weight()
        + type_bonus;

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::model::RecordMetadata;
    use crate::types::SourceKind;

    fn fresh_record(kind: RecordKind, confidence: f32, source: SourceKind) -> Record {
        Record::new(kind, "cat", "key", "val", confidence, source, RecordMetadata::None)
    }

    #[test]
    fn score_is_always_in_unit_range() {
        let r = fresh_record(RecordKind::Prospective, 1.0, SourceKind::Explicit);
        assert!((0.0..=1.0).contains(&importance(&r)));
    }

    #[test]
    fn fresh_record_scores_higher_than_stale_one() {
        let mut fresh = fresh_record(RecordKind::Semantic, 0.8, SourceKind::Explicit);
        let mut stale = fresh.clone();
        stale.last_accessed = Utc::now() - chrono::Duration::days(60);
        fresh.access_count = 10;
        assert!(importance(&fresh) > importance(&stale));
    }

    #[test]
    fn explicit_source_outweighs_system_source_all_else_equal() {
        let explicit = fresh_record(RecordKind::Episodic, 0.5, SourceKind::Explicit);
        let system = fresh_record(RecordKind::Episodic, 0.5, SourceKind::System);
        assert!(importance(&explicit) >= importance(&system));
    }
}
