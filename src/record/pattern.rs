//! Pattern detection over episodic records: bucket by `(hour, weekday)`,
//! then by `key` within each bucket, and emit a `Pattern` for buckets whose
//! event count exceeds `minOccurrences`.

use std::collections::HashMap;

use chrono::{Datelike, Timelike, Utc};

use crate::record::model::{Pattern, Record, RecordKind};

/// Detect recurring `(hour, weekday, event)` triples among `records` within
/// the last `window_days` days, keeping only events that occur at least
/// `min_occurrences` times within their bucket.
#[must_use]
pub fn detect_patterns(records: &[Record], window_days: i64, min_occurrences: usize) -> Vec<Pattern> {
    let cutoff = Utc::now() - chrono::Duration::days(window_days);

    // (hour, weekday) -> event key -> count
    let mut buckets: HashMap<(u32, u32), HashMap<String, usize>> = HashMap::new();
    let mut bucket_sizes: HashMap<(u32, u32), usize> = HashMap::new();

    for record in records {
        if record.kind != RecordKind::Episodic || record.created_at < cutoff {
            continue;
        }
        let hour = record.created_at.hour();
        let weekday = record.created_at.weekday().num_days_from_monday();
        let bucket = (hour, weekday);
        *bucket_sizes.entry(bucket).or_insert(0) += 1;
        *buckets
            .entry(bucket)
            .or_default()
            .entry(record.key.clone())
            .or_insert(0) += 1;
    }

    let mut patterns = Vec::new();
    for ((hour, weekday), events) in &buckets {
        let bucket_size = bucket_sizes.get(&(*hour, *weekday)).copied().unwrap_or(1).max(1);
        for (event, &occurrences) in events {
            if occurrences >= min_occurrences {
                patterns.push(Pattern {
                    event: event.clone(),
                    frequency: occurrences,
                    hour: *hour,
                    weekday: *weekday,
                    confidence: (occurrences as f32 / bucket_size as f32).clamp(0.0, 1.0),
                });
            }
        }
    }

    patterns.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap());
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::model::RecordMetadata;
    use crate::types::SourceKind;
    use chrono::TimeZone;

    fn episodic_at(key: &str, at: chrono::DateTime<Utc>) -> Record {
        let mut r = Record::new(
            RecordKind::Episodic,
            "cat",
            key,
            "val",
            0.5,
            SourceKind::System,
            RecordMetadata::None,
        );
        r.created_at = at;
        r
    }

    #[test]
    fn recurring_event_forms_a_pattern() {
        // Three Mondays at 08:00 doing "coffee".
        let mondays = [
            Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 8, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 15, 8, 0, 0).unwrap(),
        ];
        let records: Vec<Record> = mondays.iter().map(|&t| episodic_at("coffee", t)).collect();
        // Window must be wide enough to cover all three in the test's fixed dates.
        let patterns = detect_patterns(&records, 3650, 3);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].event, "coffee");
        assert_eq!(patterns[0].frequency, 3);
    }

    #[test]
    fn below_threshold_occurrences_produce_no_pattern() {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 8, 0, 0).unwrap();
        let records = vec![episodic_at("coffee", at)];
        let patterns = detect_patterns(&records, 3650, 3);
        assert!(patterns.is_empty());
    }

    #[test]
    fn non_episodic_records_are_ignored() {
        let mut r = episodic_at("coffee", Utc::now());
        r.kind = RecordKind::Semantic;
        let patterns = detect_patterns(&[r], 30, 1);
        assert!(patterns.is_empty());
    }
}
