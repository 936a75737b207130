//! The regex bank used for shallow fact extraction from user messages.
//!
//! Real NLP is explicitly out of scope; these patterns intentionally catch
//! only the common phrasings ("my name is", "I prefer", ...). Compiled once
//! at construction; a pattern that fails validation or compilation is
//! logged and skipped rather than crashing the engine.

use regex::Regex;
use tracing::warn;

use crate::conversation::model::FactCategory;

const MAX_PATTERN_LENGTH: usize = 1000;
const MAX_REPETITIONS: usize = 100;

/// Validate a hand-authored pattern before compiling it: reject anything
/// too long, or with a repetition count high enough to invite catastrophic
/// backtracking.
fn validate_pattern(pattern: &str) -> std::result::Result<(), String> {
    if pattern.is_empty() {
        return Err("pattern is empty".to_string());
    }
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(format!("pattern too long ({} chars)", pattern.len()));
    }
    if let Ok(re) = Regex::new(r"\{(\d+),?(\d+)?\}") {
        for cap in re.captures_iter(pattern) {
            for group in [cap.get(1), cap.get(2)].into_iter().flatten() {
                if let Ok(count) = group.as_str().parse::<usize>() {
                    if count > MAX_REPETITIONS {
                        return Err(format!("repetition count {count} exceeds maximum {MAX_REPETITIONS}"));
                    }
                }
            }
        }
    }
    Ok(())
}

struct PatternSpec {
    category: FactCategory,
    label: &'static str,
    pattern: &'static str,
}

// Every capture group below is lazy and bounded by a trailing lookahead so
// a match stops at the end of its clause instead of swallowing whatever
// the speaker says next ("... and I also like tea").
fn pattern_specs() -> &'static [PatternSpec] {
    &[
        PatternSpec { category: FactCategory::UserInfo, label: "name", pattern: r"(?i)\bmy name is ([a-z][a-z '\-]{1,60}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::UserPreference, label: "preference", pattern: r"(?i)\bi (?:prefer|like|love|enjoy) ([a-z0-9][a-z0-9 '\-]{1,80}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::TechnicalContext, label: "tech_stack", pattern: r"(?i)\bi(?:'m| am) using ([a-z0-9][a-z0-9 .+#\-]{1,60}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::ProjectDetails, label: "project", pattern: r"(?i)\b(?:working on|my project is) ([a-z0-9][a-z0-9 '\-]{1,80}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::UserInfo, label: "location", pattern: r"(?i)\bi (?:live in|work at) ([a-z][a-z0-9 '\-]{1,60}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::DomainKnowledge, label: "goal", pattern: r"(?i)\bmy goal is (?:to )?([a-z0-9][a-z0-9 '\-]{1,80}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::DomainKnowledge, label: "topic", pattern: r"(?i)\b(?:i'm interested in|i care about) ([a-z0-9][a-z0-9 '\-]{1,80}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
        PatternSpec { category: FactCategory::UserInfo, label: "people", pattern: r"(?i)\bmy (?:friend|colleague|partner|manager) (?:is |named )?([a-z][a-z '\-]{1,60}?)(?=\s+(?:and|but|so|who|that|which)\b|[,.!?;]|$)" },
    ]
}

struct CompiledPattern {
    category: FactCategory,
    regex: Regex,
}

/// The compiled, process-lifetime regex bank.
pub struct ExtractorBank {
    patterns: Vec<CompiledPattern>,
}

impl ExtractorBank {
    #[must_use]
    pub fn new() -> Self {
        let mut patterns = Vec::new();
        for spec in pattern_specs() {
            if let Err(e) = validate_pattern(spec.pattern) {
                warn!(pattern = spec.label, error = %e, "skipping invalid extraction pattern");
                continue;
            }
            match Regex::new(spec.pattern) {
                Ok(regex) => patterns.push(CompiledPattern { category: spec.category, regex }),
                Err(e) => warn!(pattern = spec.label, error = %e, "failed to compile extraction pattern"),
            }
        }
        Self { patterns }
    }

    /// Run every pattern against `message`, returning `(category, text)`
    /// pairs for each match's captured group.
    #[must_use]
    pub fn extract(&self, message: &str) -> Vec<(FactCategory, String)> {
        let mut matches = Vec::new();
        for pattern in &self.patterns {
            if let Some(caps) = pattern.regex.captures(message) {
                if let Some(group) = caps.get(1) {
                    matches.push((pattern.category, group.as_str().trim().to_string()));
                }
            }
        }
        matches
    }
}

impl Default for ExtractorBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_preference_and_tech_stack() {
        let bank = ExtractorBank::new();
        let matches = bank.extract("Hi, my name is Alice and I prefer dark roast coffee");
        assert!(matches.iter().any(|(c, t)| *c == FactCategory::UserInfo && t == "Alice"));
        assert!(matches.iter().any(|(c, _)| *c == FactCategory::UserPreference));
    }

    #[test]
    fn no_match_returns_empty() {
        let bank = ExtractorBank::new();
        assert!(bank.extract("what time is it").is_empty());
    }

    #[test]
    fn invalid_pattern_is_skipped_not_fatal() {
        assert!(validate_pattern(&"a".repeat(2000)).is_err());
        assert!(validate_pattern("{500}").is_err());
        assert!(validate_pattern(r"(?i)normal pattern").is_ok());
    }

    #[test]
    fn all_built_in_patterns_compile() {
        let bank = ExtractorBank::new();
        assert_eq!(bank.patterns.len(), pattern_specs().len());
    }
}
