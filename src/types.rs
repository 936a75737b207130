//! Types shared across tiers: the memory `Tier` taxonomy, the context
//! snapshot used by prospective triggers, and the `RetrievalSource` value
//! the active retriever merges across every tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The tier a piece of retrieved context belongs to. Used to group the
/// retriever's final context block and as a display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Working,
    LongTerm,
    Episodic,
    Semantic,
    Procedural,
}

impl Tier {
    /// Human-facing group header used when assembling the context block,
    /// e.g. `**Episodic Memory:**`.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Tier::Working => "Working Memory",
            Tier::LongTerm => "Long-Term Memory",
            Tier::Episodic => "Episodic Memory",
            Tier::Semantic => "Semantic Memory",
            Tier::Procedural => "Procedural Memory",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A single piece of content the active retriever considers for injection,
/// normalized from whichever tier produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSource {
    pub content: String,
    pub tier: Tier,
    pub relevance_score: f32,
    pub origin: String,
}

impl RetrievalSource {
    #[must_use]
    pub fn new(content: impl Into<String>, tier: Tier, relevance_score: f32, origin: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tier,
            relevance_score: relevance_score.clamp(0.0, 1.0),
            origin: origin.into(),
        }
    }

    /// The lowercased first `n` characters of `content`, used as the
    /// retriever's dedup key.
    #[must_use]
    pub fn dedup_key(&self, prefix_chars: usize) -> String {
        self.content
            .to_lowercase()
            .chars()
            .take(prefix_chars)
            .collect()
    }
}

/// Context snapshot consulted by prospective-memory triggers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub user_activity: Option<String>,
    pub current_query: Option<String>,
    pub location: Option<String>,
    pub time_of_day: Option<u8>,
    pub day_of_week: Option<u8>,
    pub battery_level: Option<f32>,
    pub is_plugged_in: Option<bool>,
}

/// A condition that activates a stored intention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Trigger {
    Time(DateTime<Utc>),
    Location(String),
    Activity(String),
    AppLaunch(String),
    Keyword(String),
    ContextMatch(String),
}

impl Trigger {
    /// Whether `snapshot` satisfies this trigger, per the documented
    /// satisfaction semantics: `time` fires once `now` has passed; `activity`
    /// and `keyword` fire on a case-insensitive substring match against the
    /// snapshot's activity/query fields; all other kinds are unsatisfied
    /// until a concrete collaborator (app launch detection, geofencing) is
    /// wired in.
    #[must_use]
    pub fn is_satisfied(&self, snapshot: &ContextSnapshot, now: DateTime<Utc>) -> bool {
        match self {
            Trigger::Time(at) => now >= *at,
            Trigger::Activity(needle) => snapshot
                .user_activity
                .as_deref()
                .is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())),
            Trigger::Keyword(needle) => snapshot
                .current_query
                .as_deref()
                .is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase())),
            Trigger::Location(_) | Trigger::AppLaunch(_) | Trigger::ContextMatch(_) => false,
        }
    }
}

/// Where a record/fact came from, used by the importance function's source
/// weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Explicit,
    Inferred,
    System,
}

impl SourceKind {
    #[must_use]
    pub fn weight(self) -> f32 {
        match self {
            SourceKind::Explicit => crate::constants::record_store::SOURCE_WEIGHT_EXPLICIT,
            SourceKind::Inferred => crate::constants::record_store::SOURCE_WEIGHT_INFERRED,
            SourceKind::System => crate::constants::record_store::SOURCE_WEIGHT_SYSTEM,
        }
    }
}

/// Classification of a task in flight, consulted by the injection gate's
/// debug-task threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Coding,
    Debugging,
    General,
}

impl TaskKind {
    #[must_use]
    pub fn is_debug_like(self) -> bool {
        matches!(self, TaskKind::Coding | TaskKind::Debugging)
    }
}

/// Free-form string attribute map used by knowledge-graph entities.
pub type AttributeMap = HashMap<String, String>;
